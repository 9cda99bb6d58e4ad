#![allow(dead_code)]

use kobert_sentiment::kobert::EncoderResources;
use rust_bert::bert::BertConfig;
use rust_bert::resources::LocalResource;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const VOCAB: [&str; 16] = [
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "정말", "좋은", "영화", "최악", "별로", "재밌다",
    "지루한", "연기", "!", "##요", "good",
];

pub const TRAIN_ROWS: [(&str, i64); 3] = [
    ("정말 좋은 영화", 1),
    ("최악 별로", 0),
    ("재밌다 !", 1),
];

pub const TEST_ROWS: [(&str, i64); 3] = [
    ("지루한 연기", 0),
    ("좋은 연기 정말 재밌다 ! 좋은 영화 good", 1),
    ("별로", 0),
];

/// Tiny encoder and corpora written to a temporary directory
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> anyhow::Result<Fixture> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("vocab.txt"), VOCAB.join("\n"))?;
        std::fs::write(
            dir.path().join("config.json"),
            serde_json::to_string(&bert_config())?,
        )?;
        let fixture = Fixture { dir };
        fixture.write_corpus("train.tsv", &TRAIN_ROWS)?;
        fixture.write_corpus("test.tsv", &TEST_ROWS)?;
        Ok(fixture)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn vocab_path(&self) -> PathBuf {
        self.path("vocab.txt")
    }

    /// Writes an NSMC-formatted corpus (`id`, `document`, `label`)
    pub fn write_corpus(&self, name: &str, rows: &[(&str, i64)]) -> anyhow::Result<PathBuf> {
        let mut content = String::from("id\tdocument\tlabel\n");
        for (id, (text, label)) in rows.iter().enumerate() {
            content.push_str(&format!("{id}\t{text}\t{label}\n"));
        }
        let path = self.path(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Writes `spiece.model` and its `spiece_vocab.txt` id table
    pub fn write_sentencepiece(&self) -> anyhow::Result<(PathBuf, PathBuf)> {
        let model_path = self.path("spiece.model");
        let vocab_path = self.path("spiece_vocab.txt");
        std::fs::write(&model_path, sentencepiece_model(&SPIECE_PIECES))?;
        std::fs::write(&vocab_path, SPIECE_VOCAB.join("\n"))?;
        Ok((model_path, vocab_path))
    }

    pub fn encoder_resources(&self) -> EncoderResources {
        EncoderResources {
            config_resource: local(self.path("config.json")),
            vocab_resource: local(self.vocab_path()),
            sentencepiece_resource: None,
            model_resource: None,
        }
    }
}

/// Pieces of the SentencePiece model used by the KoBERT-style tokenizer tests
pub const SPIECE_PIECES: [(&str, f32); 8] = [
    ("\u{2581}좋은", -1.0),
    ("\u{2581}영화", -1.0),
    ("\u{2581}", -10.0),
    ("좋", -10.0),
    ("은", -10.0),
    ("영", -10.0),
    ("화", -10.0),
    ("\u{2581}정말", -1.0),
];

/// Id table of the SentencePiece tests, with KoBERT's special token ids
pub const SPIECE_VOCAB: [&str; 7] = [
    "[UNK]",
    "[PAD]",
    "[CLS]",
    "[SEP]",
    "[MASK]",
    "\u{2581}좋은",
    "\u{2581}영화",
];

/// Serializes a SentencePiece `ModelProto` holding only its `pieces` field
pub fn sentencepiece_model(pieces: &[(&str, f32)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (piece, score) in pieces {
        let mut entry = vec![0x0A, piece.len() as u8];
        entry.extend_from_slice(piece.as_bytes());
        entry.push(0x15);
        entry.extend_from_slice(&score.to_le_bytes());
        assert!(entry.len() < 128);
        bytes.push(0x0A);
        bytes.push(entry.len() as u8);
        bytes.extend(entry);
    }
    bytes
}

pub fn local<P: AsRef<Path>>(path: P) -> Box<LocalResource> {
    Box::new(LocalResource {
        local_path: path.as_ref().to_path_buf(),
    })
}

pub fn bert_config() -> BertConfig {
    BertConfig {
        hidden_size: 16,
        intermediate_size: 32,
        max_position_embeddings: 32,
        num_attention_heads: 2,
        num_hidden_layers: 2,
        vocab_size: VOCAB.len() as i64,
        ..Default::default()
    }
}
