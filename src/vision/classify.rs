//! Binary decision over the model's output tensor.
//!
//! The first output value is read as a signed 8-bit quantity and compared
//! against a floating threshold (0.5 by default).  For an int8 tensor this
//! places the boundary between 0 and 1, i.e. effectively at the raw zero
//! point rather than at a dequantized probability of one half.  The literal
//! comparison is kept; a model whose output zero point is not near zero
//! will be biased towards one label.

use crate::error::CycleError;

/// Decoded classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Cat,
    Person,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cat => "cat",
            Self::Person => "person",
        }
    }
}

/// Threshold classifier over the first output value.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    threshold: f32,
}

impl Classifier {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Label for a single raw score: `score >= threshold` → [`Label::Cat`].
    pub fn label_for(&self, score: i8) -> Label {
        if f32::from(score) >= self.threshold {
            Label::Cat
        } else {
            Label::Person
        }
    }

    /// Decide on the output tensor.  Returns the label and the raw score.
    pub fn decide(&self, output: &[i8]) -> Result<(Label, i8), CycleError> {
        let &score = output.first().ok_or(CycleError::EmptyOutput)?;
        Ok((self.label_for(score), score))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_score_is_cat() {
        let c = Classifier::default();
        assert_eq!(c.decide(&[10]).unwrap(), (Label::Cat, 10));
        assert_eq!(c.label_for(1), Label::Cat);
        assert_eq!(c.label_for(127), Label::Cat);
    }

    #[test]
    fn zero_and_negative_scores_are_person() {
        let c = Classifier::default();
        assert_eq!(c.decide(&[-10]).unwrap().0, Label::Person);
        assert_eq!(c.label_for(0), Label::Person);
        assert_eq!(c.label_for(-128), Label::Person);
    }

    #[test]
    fn only_first_value_counts() {
        let c = Classifier::default();
        assert_eq!(c.decide(&[-5, 100, 100]).unwrap().0, Label::Person);
    }

    #[test]
    fn empty_output_is_an_error() {
        assert_eq!(Classifier::default().decide(&[]), Err(CycleError::EmptyOutput));
    }

    #[test]
    fn threshold_is_inclusive() {
        let c = Classifier::new(3.0);
        assert_eq!(c.label_for(3), Label::Cat);
        assert_eq!(c.label_for(2), Label::Person);
    }
}
