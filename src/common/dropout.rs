// Copyright 2019 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use tch::nn::ModuleT;
use tch::Tensor;

/// Dropout layer that can be switched off entirely.
///
/// A missing or zero rate turns the layer into the identity, in training as well as in
/// evaluation mode.
#[derive(Debug)]
pub struct OptionalDropout {
    dropout_prob: Option<f64>,
}

impl OptionalDropout {
    pub fn new(p: Option<f64>) -> OptionalDropout {
        let dropout_prob = p.filter(|value| *value > 0.0);
        OptionalDropout { dropout_prob }
    }
}

impl ModuleT for OptionalDropout {
    fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        match self.dropout_prob {
            Some(p) => input.dropout(p, train),
            None => input.shallow_clone(),
        }
    }
}
