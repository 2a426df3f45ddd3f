//! Verification code generation

use rand::Rng;
use std::fmt::Debug;

use crate::domain::identity::VERIFICATION_CODE_LENGTH;

/// Source of one-time verification codes
pub trait CodeGenerator: Send + Sync + Debug {
    fn generate(&self) -> String;
}

/// Uniformly random numeric codes
#[derive(Debug, Clone, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..VERIFICATION_CODE_LENGTH)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

/// Always issues the same code; for local development and tests
#[derive(Debug, Clone)]
pub struct FixedCodeGenerator {
    code: String,
}

impl FixedCodeGenerator {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self) -> String {
        self.code.clone()
    }
}
