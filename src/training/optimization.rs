use crate::common::error::KoBertError;
use tch::{nn, TchError, Tensor};

/// Name fragments of the parameters excluded from weight decay
pub const NO_DECAY_PATTERNS: [&str; 3] = ["bias", "LayerNorm.bias", "LayerNorm.weight"];

/// # Model parameters split into weight-decay groups
/// Parameters are sorted by name; a parameter whose name contains any of
/// [`NO_DECAY_PATTERNS`] goes to the `no_decay` group, every other one to `decay`.
pub struct ParameterGroups {
    decay: Vec<(String, Tensor)>,
    no_decay: Vec<(String, Tensor)>,
}

impl ParameterGroups {
    pub fn from_var_store(vs: &nn::VarStore) -> ParameterGroups {
        ParameterGroups::from_named_parameters(vs.variables())
    }

    pub fn from_named_parameters<I>(parameters: I) -> ParameterGroups
    where
        I: IntoIterator<Item = (String, Tensor)>,
    {
        let mut parameters = parameters.into_iter().collect::<Vec<_>>();
        parameters.sort_by(|(left, _), (right, _)| left.cmp(right));
        let (no_decay, decay) = parameters.into_iter().partition(|(name, _)| {
            NO_DECAY_PATTERNS
                .iter()
                .any(|pattern| name.contains(pattern))
        });
        ParameterGroups { decay, no_decay }
    }

    pub fn decay_names(&self) -> Vec<&str> {
        self.decay.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn no_decay_names(&self) -> Vec<&str> {
        self.no_decay.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn parameters(&self) -> impl Iterator<Item = &Tensor> {
        self.decay
            .iter()
            .chain(self.no_decay.iter())
            .map(|(_, parameter)| parameter)
    }

    /// Decoupled weight decay: scales every decay-group parameter holding a gradient by
    /// `1 - lr * weight_decay`. Meant to run right before the optimizer step.
    pub fn apply_weight_decay(&self, lr: f64, weight_decay: f64) -> Result<(), KoBertError> {
        if weight_decay == 0.0 {
            return Ok(());
        }
        let factor = 1.0 - lr * weight_decay;
        tch::no_grad(|| -> Result<(), TchError> {
            for (_, parameter) in self.decay.iter() {
                if parameter.grad().defined() {
                    let mut parameter = parameter.shallow_clone();
                    let _ = parameter.f_mul_scalar_(factor)?;
                }
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Rescales the gradients in place so that their global L2 norm is at most `max_norm`.
    /// Parameters without a gradient (e.g. a frozen encoder) are ignored.
    ///
    /// # Returns
    ///
    /// * global gradient norm before clipping
    pub fn clip_grad_norm(&self, max_norm: f64) -> Result<f64, KoBertError> {
        let total_norm = tch::no_grad(|| -> Result<f64, TchError> {
            let mut gradients = self
                .parameters()
                .map(|parameter| parameter.grad())
                .filter(|gradient| gradient.defined())
                .collect::<Vec<Tensor>>();
            if gradients.is_empty() {
                return Ok(0.0);
            }
            let norms = gradients
                .iter()
                .map(|gradient| gradient.norm())
                .collect::<Vec<Tensor>>();
            let total_norm = Tensor::f_stack(&norms, 0)?.norm().double_value(&[]);
            let clip_coefficient = max_norm / (total_norm + 1e-6);
            if clip_coefficient < 1.0 {
                for gradient in gradients.iter_mut() {
                    let _ = gradient.f_mul_scalar_(clip_coefficient)?;
                }
            }
            Ok(total_norm)
        })?;
        Ok(total_norm)
    }
}

/// # Linear warmup then linear decay learning rate schedule
/// The rate rises from 0 to `base_lr` over `warmup_steps`, then decreases linearly to 0 at
/// `total_steps`.
#[derive(Debug, Clone)]
pub struct LinearWarmupSchedule {
    base_lr: f64,
    warmup_steps: usize,
    total_steps: usize,
    current_step: usize,
}

impl LinearWarmupSchedule {
    /// `warmup_steps` is `floor(total_steps * warmup_ratio)`.
    pub fn new(base_lr: f64, total_steps: usize, warmup_ratio: f64) -> LinearWarmupSchedule {
        LinearWarmupSchedule {
            base_lr,
            warmup_steps: (total_steps as f64 * warmup_ratio) as usize,
            total_steps,
            current_step: 0,
        }
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            self.base_lr * step as f64 / self.warmup_steps.max(1) as f64
        } else {
            let remaining = self.total_steps.saturating_sub(step) as f64;
            let decay_steps = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
            self.base_lr * remaining / decay_steps
        }
    }

    pub fn current_lr(&self) -> f64 {
        self.lr_at(self.current_step)
    }

    /// Advances the schedule by one step and applies the new rate to the optimizer.
    pub fn step(&mut self, optimizer: &mut nn::Optimizer) {
        self.current_step += 1;
        optimizer.set_lr(self.current_lr());
    }
}
