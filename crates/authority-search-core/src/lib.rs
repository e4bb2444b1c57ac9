use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const RULESET_VERSION: &str = "authority-sort.v1";

/// Record keys that carry sort input and never reach a [`SearchResult`].
pub const RESERVED_KEYS: [&str; 2] = ["sort", "values"];

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum OrderingError {
    #[error("validation error: {0}")]
    Validation(String),
}

/// Identifier of a property (usually an IRI) whose values feed one sort position.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct SortPredicate(String);

impl SortPredicate {
    /// Parse a predicate identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns [`OrderingError::Validation`] when the identifier is blank.
    pub fn parse(value: &str) -> Result<Self, OrderingError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(OrderingError::Validation(
                "sort predicate MUST be a non-empty identifier".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SortPredicate {
    type Error = OrderingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SortPredicate> for String {
    fn from(value: SortPredicate) -> Self {
        value.0
    }
}

impl Display for SortPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered list of sort predicates. An empty policy disables sorting.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SortPolicy {
    predicates: Vec<SortPredicate>,
}

impl SortPolicy {
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build a policy from predicate identifiers in declaration order.
    ///
    /// # Errors
    /// Returns [`OrderingError::Validation`] when any identifier is blank.
    pub fn new<I, S>(predicates: I) -> Result<Self, OrderingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let predicates = predicates
            .into_iter()
            .map(|predicate| SortPredicate::parse(predicate.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { predicates })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.predicates.is_empty()
    }

    #[must_use]
    pub fn predicates(&self) -> &[SortPredicate] {
        &self.predicates
    }

    /// Resolve one sort term per predicate from a record's predicate values.
    ///
    /// A predicate with no non-empty value yields the empty string. When a
    /// predicate carries several values the smallest one under [`compare_terms`]
    /// is used, so the result does not depend on the order values arrived in.
    /// Value keys match predicates after trimming surrounding whitespace.
    #[must_use]
    pub fn resolve_terms(&self, values: &BTreeMap<String, Vec<String>>) -> Vec<String> {
        self.predicates
            .iter()
            .map(|predicate| {
                values
                    .iter()
                    .filter(|(key, _)| key.trim() == predicate.as_str())
                    .flat_map(|(_, candidates)| candidates)
                    .filter(|value| !value.is_empty())
                    .min_by(|lhs, rhs| compare_terms(lhs, rhs))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// A search result as handed back to callers: a display label plus any
/// passthrough attributes (`uri`, `id`, ...) the orderer never inspects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub label: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl SearchResult {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), attributes: Map::new() }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Drop attributes named like the sort input fields, keeping the rest in order.
    #[must_use]
    pub fn without_reserved_keys(mut self) -> Self {
        self.attributes.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
        self
    }
}

/// A search result carrying the sort terms resolved for the active policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortableResult {
    #[serde(flatten)]
    pub result: SearchResult,
    #[serde(rename = "sort", default)]
    pub sort_terms: Vec<String>,
}

impl SortableResult {
    #[must_use]
    pub fn new(result: SearchResult, sort_terms: Vec<String>) -> Self {
        Self { result, sort_terms }
    }

    #[must_use]
    pub fn into_result(self) -> SearchResult {
        self.result.without_reserved_keys()
    }
}

/// A search result whose sort terms have not been resolved yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateRecord {
    #[serde(flatten)]
    pub result: SearchResult,
    #[serde(rename = "values", default)]
    pub predicate_values: BTreeMap<String, Vec<String>>,
}

impl CandidateRecord {
    #[must_use]
    pub fn new(result: SearchResult) -> Self {
        Self { result, predicate_values: BTreeMap::new() }
    }

    #[must_use]
    pub fn with_value(mut self, predicate: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicate_values.entry(predicate.into()).or_default().push(value.into());
        self
    }

    #[must_use]
    pub fn into_sortable(self, policy: &SortPolicy) -> SortableResult {
        let sort_terms = policy.resolve_terms(&self.predicate_values);
        SortableResult { result: self.result.without_reserved_keys(), sort_terms }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct OrderingMetadata {
    pub ruleset_version: String,
    pub sort_predicates: Vec<String>,
    pub tie_breakers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum TermClass {
    Empty,
    Numeric,
    Text,
}

impl TermClass {
    fn of(term: &str) -> Self {
        if term.is_empty() {
            Self::Empty
        } else if is_numeric_term(term) {
            Self::Numeric
        } else {
            Self::Text
        }
    }
}

/// True when `term` is non-empty and made only of ASCII decimal digits.
#[must_use]
pub fn is_numeric_term(term: &str) -> bool {
    !term.is_empty() && term.bytes().all(|byte| byte.is_ascii_digit())
}

// Digit strings of any length: drop leading zeros, then longer is larger.
fn compare_magnitude(lhs: &str, rhs: &str) -> Ordering {
    let lhs = lhs.trim_start_matches('0');
    let rhs = rhs.trim_start_matches('0');
    lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs))
}

/// Compare two sort terms at the same position.
///
/// Empty sorts first. Two all-digit terms compare by magnitude. Anything else
/// compares byte-wise, case-sensitive.
#[must_use]
pub fn compare_terms(lhs: &str, rhs: &str) -> Ordering {
    match (TermClass::of(lhs), TermClass::of(rhs)) {
        (TermClass::Empty, TermClass::Empty) => Ordering::Equal,
        (TermClass::Empty, _) => Ordering::Less,
        (_, TermClass::Empty) => Ordering::Greater,
        (TermClass::Numeric, TermClass::Numeric) => compare_magnitude(lhs, rhs),
        _ => lhs.cmp(rhs),
    }
}

/// Compare two term lists position by position; the first difference decides.
/// When one list is a prefix of the other the shorter one sorts first.
#[must_use]
pub fn compare_sort_terms<S: AsRef<str>>(lhs: &[S], rhs: &[S]) -> Ordering {
    lhs.iter()
        .zip(rhs)
        .map(|(left, right)| compare_terms(left.as_ref(), right.as_ref()))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| lhs.len().cmp(&rhs.len()))
}

/// Stable top-down merge sort. Always terminates with every element present,
/// even when `compare` is not transitive (mixed digit/text terms can do that).
fn stable_merge_sort_by<T, F>(mut items: Vec<T>, compare: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }

    let right = items.split_off(items.len() / 2);
    let left = stable_merge_sort_by(items, compare);
    let right = stable_merge_sort_by(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(lhs), Some(rhs)) => compare(rhs, lhs) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        if let Some(item) = next {
            merged.push(item);
        }
    }
    merged
}

/// Orders search results according to a [`SortPolicy`].
#[derive(Debug, Clone, Default)]
pub struct ResultOrderer {
    policy: SortPolicy,
}

impl ResultOrderer {
    #[must_use]
    pub fn new(policy: SortPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &SortPolicy {
        &self.policy
    }

    #[must_use]
    pub fn supports_sort(&self) -> bool {
        self.policy.is_enabled()
    }

    /// Put `records` in presentation order and drop their sort terms.
    ///
    /// Without sort predicates the input order is returned untouched. Records
    /// with equal term lists keep their relative input order.
    #[must_use]
    pub fn order(&self, records: Vec<SortableResult>) -> Vec<SearchResult> {
        if !self.policy.is_enabled() {
            tracing::debug!(
                "No sort predicate configured; keeping {} results in source order",
                records.len()
            );
            return records.into_iter().map(SortableResult::into_result).collect();
        }

        let expected_terms = self.policy.predicates().len();
        let mismatched =
            records.iter().filter(|record| record.sort_terms.len() != expected_terms).count();
        if mismatched > 0 {
            tracing::warn!(
                "{} of {} results carry a sort term count different from the {} configured predicates",
                mismatched,
                records.len(),
                expected_terms
            );
        }

        tracing::debug!("Ordering {} results on {} sort predicates", records.len(), expected_terms);
        let mut by_terms = |lhs: &SortableResult, rhs: &SortableResult| {
            compare_sort_terms(&lhs.sort_terms, &rhs.sort_terms)
        };
        let ordered = stable_merge_sort_by(records, &mut by_terms);
        ordered.into_iter().map(SortableResult::into_result).collect()
    }

    /// Resolve sort terms for each candidate with this orderer's policy, then order.
    #[must_use]
    pub fn order_candidates(&self, records: Vec<CandidateRecord>) -> Vec<SearchResult> {
        let sortable = records
            .into_iter()
            .map(|record| record.into_sortable(&self.policy))
            .collect::<Vec<_>>();
        self.order(sortable)
    }

    /// Describe the precedence this orderer applies, most significant first.
    #[must_use]
    pub fn determinism(&self) -> OrderingMetadata {
        let sort_predicates = self
            .policy
            .predicates()
            .iter()
            .map(|predicate| predicate.as_str().to_string())
            .collect::<Vec<_>>();

        let mut tie_breakers = sort_predicates
            .iter()
            .enumerate()
            .map(|(index, predicate)| {
                format!("sort[{index}] {predicate} asc (empty first, numeric when all digits)")
            })
            .collect::<Vec<_>>();
        if self.policy.is_enabled() {
            tie_breakers.push("sort term count asc".to_string());
        }
        tie_breakers.push("source order".to_string());

        OrderingMetadata {
            ruleset_version: RULESET_VERSION.to_string(),
            sort_predicates,
            tie_breakers,
        }
    }
}
