//! Usage accounting for model calls.
//!
//! [`Usage`] is an additive record of consumption counters. Together with
//! [`Usage::zero`] it forms a monoid: addition is associative and the zero
//! value is a left and right unit. Addition is also commutative as long as
//! neither operand carries a per-request breakdown
//! ([`Usage::request_usage_entries`]), since that list is concatenated in
//! operand order.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Detailed breakdown of input tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputTokensDetails {
    /// Tokens served from the provider's prompt cache.
    #[serde(default)]
    pub cached_tokens: u64,
}

impl Add for InputTokensDetails {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            cached_tokens: self.cached_tokens + rhs.cached_tokens,
        }
    }
}

/// Detailed breakdown of output tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputTokensDetails {
    /// Tokens spent on hidden reasoning.
    #[serde(default)]
    pub reasoning_tokens: u64,
}

impl Add for OutputTokensDetails {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            reasoning_tokens: self.reasoning_tokens + rhs.reasoning_tokens,
        }
    }
}

/// Usage of a single model request, kept in [`Usage::request_usage_entries`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestUsage {
    /// Input tokens of this request.
    pub input_tokens: u64,
    /// Output tokens of this request.
    pub output_tokens: u64,
    /// Total tokens of this request.
    pub total_tokens: u64,
    /// Input token breakdown.
    #[serde(default)]
    pub input_tokens_details: InputTokensDetails,
    /// Output token breakdown.
    #[serde(default)]
    pub output_tokens_details: OutputTokensDetails,
}

/// Accumulated consumption counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of model requests.
    #[serde(default)]
    pub requests: u64,

    /// Number of tokens in the input/prompt.
    #[serde(default, alias = "prompt_tokens")]
    pub input_tokens: u64,

    /// Number of tokens in the output/completion.
    #[serde(default, alias = "completion_tokens")]
    pub output_tokens: u64,

    /// Total tokens used.
    #[serde(default)]
    pub total_tokens: u64,

    /// Input token breakdown.
    #[serde(default)]
    pub input_tokens_details: InputTokensDetails,

    /// Output token breakdown.
    #[serde(default)]
    pub output_tokens_details: OutputTokensDetails,

    /// Per-request breakdown, in the order requests were accumulated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_usage_entries: Vec<RequestUsage>,
}

impl Usage {
    /// Usage of one model request with the given token counts.
    #[must_use]
    pub const fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            requests: 1,
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            input_tokens_details: InputTokensDetails { cached_tokens: 0 },
            output_tokens_details: OutputTokensDetails {
                reasoning_tokens: 0,
            },
            request_usage_entries: Vec::new(),
        }
    }

    /// The additive identity: every counter zero, no breakdown.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            requests: 0,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            input_tokens_details: InputTokensDetails { cached_tokens: 0 },
            output_tokens_details: OutputTokensDetails {
                reasoning_tokens: 0,
            },
            request_usage_entries: Vec::new(),
        }
    }

    /// Set the cached input tokens.
    #[must_use]
    pub const fn with_cached(mut self, cached_tokens: u64) -> Self {
        self.input_tokens_details.cached_tokens = cached_tokens;
        self
    }

    /// Set the reasoning output tokens.
    #[must_use]
    pub const fn with_reasoning(mut self, reasoning_tokens: u64) -> Self {
        self.output_tokens_details.reasoning_tokens = reasoning_tokens;
        self
    }

    /// Attach this record's own counters as a per-request breakdown entry.
    ///
    /// Only applies to single-request records without an existing
    /// breakdown; anything else is returned unchanged.
    #[must_use]
    pub fn with_request_entry(mut self) -> Self {
        if self.requests == 1 && self.request_usage_entries.is_empty() {
            let entry = self.as_request();
            self.request_usage_entries.push(entry);
        }
        self
    }

    /// Returns `true` if this is the identity element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::zero()
    }

    /// Add `other` to this record and return the sum.
    #[must_use]
    pub fn add_usage(&self, other: &Self) -> Self {
        let mut entries =
            Vec::with_capacity(self.request_usage_entries.len() + other.request_usage_entries.len());
        entries.extend_from_slice(&self.request_usage_entries);
        entries.extend_from_slice(&other.request_usage_entries);

        Self {
            requests: self.requests + other.requests,
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            input_tokens_details: self.input_tokens_details + other.input_tokens_details,
            output_tokens_details: self.output_tokens_details + other.output_tokens_details,
            request_usage_entries: entries,
        }
    }

    const fn as_request(&self) -> RequestUsage {
        RequestUsage {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            total_tokens: self.total_tokens,
            input_tokens_details: self.input_tokens_details,
            output_tokens_details: self.output_tokens_details,
        }
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.add_usage(&rhs)
    }
}

impl Add<&Self> for Usage {
    type Output = Self;

    fn add(self, rhs: &Self) -> Self::Output {
        self.add_usage(rhs)
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.add_usage(&rhs);
    }
}

impl AddAssign<&Self> for Usage {
    fn add_assign(&mut self, rhs: &Self) {
        *self = self.add_usage(rhs);
    }
}

impl Sum for Usage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, u| acc + u)
    }
}

impl<'a> Sum<&'a Self> for Usage {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, u| acc + u)
    }
}

impl std::fmt::Display for Usage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Usage(requests: {}, in: {}, out: {}, total: {})",
            self.requests, self.input_tokens, self.output_tokens, self.total_tokens
        )?;
        let cached = self.input_tokens_details.cached_tokens;
        if cached > 0 {
            write!(f, " [cached: {cached}]")?;
        }
        let reasoning = self.output_tokens_details.reasoning_tokens;
        if reasoning > 0 {
            write!(f, " [reasoning: {reasoning}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_a() -> Usage {
        Usage::new(100, 50).with_cached(10)
    }

    fn sample_b() -> Usage {
        Usage::new(7, 3).with_reasoning(2)
    }

    fn sample_c() -> Usage {
        Usage {
            requests: 2,
            ..Usage::new(1, 1)
        }
    }

    mod construction {
        use super::*;

        #[test]
        fn new_counts_one_request() {
            let u = Usage::new(10, 5);
            assert_eq!(u.requests, 1);
            assert_eq!(u.total_tokens, 15);
            assert!(u.request_usage_entries.is_empty());
        }

        #[test]
        fn zero_is_default() {
            assert_eq!(Usage::zero(), Usage::default());
            assert!(Usage::zero().is_empty());
            assert!(!Usage::new(1, 0).is_empty());
        }

        #[test]
        fn with_request_entry_only_for_single_requests() {
            let u = Usage::new(4, 2).with_request_entry();
            assert_eq!(u.request_usage_entries.len(), 1);
            assert_eq!(u.request_usage_entries[0].total_tokens, 6);

            let twice = u.clone().with_request_entry();
            assert_eq!(twice.request_usage_entries.len(), 1);

            let multi = sample_c().with_request_entry();
            assert!(multi.request_usage_entries.is_empty());
        }
    }

    mod monoid {
        use super::*;

        #[test]
        fn zero_is_left_and_right_unit() {
            for u in [sample_a(), sample_b(), sample_c(), Usage::zero()] {
                assert_eq!(Usage::zero().add(u.clone()), u);
                assert_eq!(u.clone().add(Usage::zero()), u);
            }
        }

        #[test]
        fn addition_is_commutative_without_breakdowns() {
            let (a, b) = (sample_a(), sample_b());
            assert_eq!(a.clone().add(b.clone()), b.add(a));
        }

        #[test]
        fn addition_is_associative() {
            let (a, b, c) = (
                sample_a().with_request_entry(),
                sample_b().with_request_entry(),
                sample_c(),
            );
            let left = (a.clone() + b.clone()) + c.clone();
            let right = a + (b + c);
            assert_eq!(left, right);
        }

        #[test]
        fn breakdowns_concatenate_in_operand_order() {
            let a = Usage::new(1, 1).with_request_entry();
            let b = Usage::new(2, 2).with_request_entry();
            let sum = a + b;
            assert_eq!(sum.requests, 2);
            assert_eq!(sum.request_usage_entries.len(), 2);
            assert_eq!(sum.request_usage_entries[0].input_tokens, 1);
            assert_eq!(sum.request_usage_entries[1].input_tokens, 2);
        }

        #[test]
        fn details_are_summed() {
            let sum = sample_a() + sample_b();
            assert_eq!(sum.input_tokens_details.cached_tokens, 10);
            assert_eq!(sum.output_tokens_details.reasoning_tokens, 2);
            assert_eq!(sum.total_tokens, 160);
        }

        #[test]
        fn add_assign_and_sum_agree() {
            let mut acc = Usage::zero();
            acc += sample_a();
            acc += &sample_b();
            let summed: Usage = [sample_a(), sample_b()].into_iter().sum();
            assert_eq!(acc, summed);
        }
    }

    mod serde_support {
        use super::*;

        #[test]
        fn accepts_openai_aliases() {
            let json = r#"{"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}"#;
            let u: Usage = serde_json::from_str(json).unwrap();
            assert_eq!(u.input_tokens, 12);
            assert_eq!(u.output_tokens, 3);
            assert_eq!(u.requests, 0);
        }

        #[test]
        fn empty_breakdown_is_not_serialized() {
            let json = serde_json::to_string(&Usage::new(1, 1)).unwrap();
            assert!(!json.contains("request_usage_entries"));
        }
    }

    #[test]
    fn display_shows_details_when_present() {
        let s = sample_a().to_string();
        assert!(s.contains("requests: 1"));
        assert!(s.contains("[cached: 10]"));
        assert!(!s.contains("reasoning"));
    }
}
