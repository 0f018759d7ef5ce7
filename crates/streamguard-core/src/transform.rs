use thiserror::Error;

/// Per-record processing step run by [`crate::StreamRunner`].
pub trait RecordTransform {
    type Error: std::error::Error + 'static;

    fn apply(&mut self, value: &str) -> Result<String, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("injected failure on call {call}: It works on my box!!!")]
pub struct TransformError {
    pub call: u64,
}

/// Upper-cases each record, except on the configured call numbers where it fails.
///
/// The call counter belongs to the value, so every run starts from zero.
#[derive(Debug, Clone)]
pub struct InjectedFailureTransform {
    calls: u64,
    fail_on: Vec<u64>,
}

impl Default for InjectedFailureTransform {
    fn default() -> Self {
        Self::new(vec![2, 8, 15])
    }
}

impl InjectedFailureTransform {
    /// `fail_on` holds 1-based call numbers.
    pub fn new(fail_on: Vec<u64>) -> Self {
        Self { calls: 0, fail_on }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn fail_on(&self) -> &[u64] {
        &self.fail_on
    }
}

impl RecordTransform for InjectedFailureTransform {
    type Error = TransformError;

    fn apply(&mut self, value: &str) -> Result<String, TransformError> {
        self.calls += 1;
        if self.fail_on.contains(&self.calls) {
            return Err(TransformError { call: self.calls });
        }
        Ok(value.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_on_default_calls() {
        let mut t = InjectedFailureTransform::default();
        let failed: Vec<u64> = (1..=20)
            .filter_map(|_| t.apply("x").err().map(|e| e.call))
            .collect();
        assert_eq!(failed, vec![2, 8, 15]);
        assert_eq!(t.calls(), 20);
    }

    #[test]
    fn upper_cases_other_records() {
        let mut t = InjectedFailureTransform::new(vec![]);
        assert_eq!(t.apply("hello world").unwrap(), "HELLO WORLD");
        assert_eq!(t.apply("").unwrap(), "");
    }

    #[test]
    fn each_instance_counts_independently() {
        let mut a = InjectedFailureTransform::default();
        let mut b = InjectedFailureTransform::default();
        a.apply("1").unwrap();
        assert!(a.apply("2").is_err());
        assert!(b.apply("1").is_ok());
    }
}
