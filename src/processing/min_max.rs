//! Immutable (min, max) pair with an empty state.

use std::ops::Add;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DataToolsError, DataToolsResult};

/// A (min, max) pair that may not have seen a value yet.
///
/// Combining is associative and commutative, and [`MinMax::empty`] is the identity, so partial
/// pairs from any partition of the input merge to the same result. Every combination returns a
/// new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MinMax<T> {
    bounds: Option<(T, T)>,
}

impl<T> MinMax<T> {
    /// A pair without a value.
    pub const fn empty() -> Self {
        Self { bounds: None }
    }

    pub fn has_value(&self) -> bool {
        self.bounds.is_some()
    }

    /// Smallest value seen; an error if the pair is empty.
    pub fn min_value(&self) -> DataToolsResult<&T> {
        self.bounds
            .as_ref()
            .map(|(min, _)| min)
            .ok_or(DataToolsError::EmptyMinMax)
    }

    /// Largest value seen; an error if the pair is empty.
    pub fn max_value(&self) -> DataToolsResult<&T> {
        self.bounds
            .as_ref()
            .map(|(_, max)| max)
            .ok_or(DataToolsError::EmptyMinMax)
    }

    /// `(min, max)` or `None` when empty.
    pub fn as_pair(&self) -> Option<(&T, &T)> {
        self.bounds.as_ref().map(|(min, max)| (min, max))
    }

    pub fn into_pair(self) -> Option<(T, T)> {
        self.bounds
    }

    /// Apply `f` to both bounds.
    ///
    /// `f` should be monotonic; the result is not re-ordered.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> MinMax<U> {
        MinMax {
            bounds: self.bounds.map(|(min, max)| (f(min), f(max))),
        }
    }
}

impl<T: PartialOrd + Clone> MinMax<T> {
    /// A pair holding a single value.
    pub fn of(value: T) -> Self {
        Self {
            bounds: Some((value.clone(), value)),
        }
    }

    /// A pair spanning `a` and `b`, in either order.
    pub fn new(a: T, b: T) -> Self {
        if b < a {
            Self { bounds: Some((b, a)) }
        } else {
            Self { bounds: Some((a, b)) }
        }
    }

    /// A pair from bounds already known to satisfy `min <= max`.
    pub(crate) fn ordered(min: T, max: T) -> Self {
        Self { bounds: Some((min, max)) }
    }

    /// A new pair that also covers `value`.
    ///
    /// On ties the existing bound is kept. A value that is unordered against the bounds
    /// (e.g. NaN) does not move them.
    pub fn extend(&self, value: T) -> Self {
        match &self.bounds {
            None => Self::of(value),
            Some((min, max)) => {
                let new_min = if value < *min { value.clone() } else { min.clone() };
                let new_max = if value > *max { value } else { max.clone() };
                Self {
                    bounds: Some((new_min, new_max)),
                }
            }
        }
    }

    /// A new pair covering both `self` and `other`.
    pub fn merge(&self, other: &Self) -> Self {
        match (&self.bounds, &other.bounds) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some(_), Some((min, max))) => self.extend(min.clone()).extend(max.clone()),
        }
    }
}

/// Deserialized bounds must satisfy `min <= max`.
impl<'de, T> Deserialize<'de> for MinMax<T>
where
    T: Deserialize<'de> + PartialOrd,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw<T> {
            bounds: Option<(T, T)>,
        }

        let Raw { bounds } = Raw::deserialize(deserializer)?;
        if let Some((min, max)) = &bounds {
            if max < min {
                return Err(D::Error::custom("MinMax bounds out of order: min is greater than max"));
            }
        }
        Ok(Self { bounds })
    }
}

impl<T> Default for MinMax<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: PartialOrd + Clone> Add for MinMax<T> {
    type Output = MinMax<T>;

    fn add(self, rhs: Self) -> Self::Output {
        self.merge(&rhs)
    }
}

impl<T: PartialOrd + Clone> FromIterator<T> for MinMax<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |acc, v| acc.extend(v))
    }
}

#[cfg(test)]
mod tests {
    use super::MinMax;
    use crate::error::DataToolsError;

    #[test]
    fn empty_pair_has_no_observable_bounds() {
        let mm = MinMax::<i32>::empty();
        assert!(!mm.has_value());
        assert!(matches!(mm.min_value(), Err(DataToolsError::EmptyMinMax)));
        assert!(matches!(mm.max_value(), Err(DataToolsError::EmptyMinMax)));
        assert_eq!(mm.as_pair(), None);
        assert_eq!(MinMax::<i32>::default(), mm);
    }

    #[test]
    fn extend_from_empty_is_a_single_value_pair() {
        assert_eq!(MinMax::empty().extend(7), MinMax::new(7, 7));
        assert_eq!(MinMax::of(7).into_pair(), Some((7, 7)));
    }

    #[test]
    fn new_orders_its_arguments() {
        let mm = MinMax::new(9, 2);
        assert_eq!(*mm.min_value().unwrap(), 2);
        assert_eq!(*mm.max_value().unwrap(), 9);
    }

    #[test]
    fn monoid_laws_hold() {
        let a = MinMax::new(3, 8);
        let b = MinMax::of(-1);
        let c = MinMax::new(5, 12);
        let e = MinMax::empty();

        assert_eq!(a.merge(&e), a);
        assert_eq!(e.merge(&a), a);
        assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
        assert_eq!(a.merge(&b), b.merge(&a));
        assert_eq!(a + c, MinMax::new(3, 12));
    }

    #[test]
    fn collect_and_map() {
        let mm: MinMax<f64> = [2.5, -1.0, 7.25].into_iter().collect();
        assert_eq!(mm.as_pair(), Some((&-1.0, &7.25)));
        assert_eq!(mm.map(|v| v * 2.0), MinMax::new(-2.0, 14.5));

        let none: MinMax<f64> = std::iter::empty().collect();
        assert!(!none.has_value());
    }

    #[test]
    fn serde_keeps_bounds_ordered() {
        let mm = MinMax::new(-3, 14);
        let text = serde_json::to_string(&mm).unwrap();
        assert_eq!(serde_json::from_str::<MinMax<i32>>(&text).unwrap(), mm);
        assert_eq!(
            serde_json::from_str::<MinMax<i32>>(r#"{"bounds":null}"#).unwrap(),
            MinMax::empty()
        );
        assert!(serde_json::from_str::<MinMax<i32>>(r#"{"bounds":[9,2]}"#).is_err());
    }

    #[test]
    fn nan_does_not_move_established_bounds() {
        let mm = MinMax::new(1.0, 2.0).extend(f64::NAN);
        assert_eq!(mm, MinMax::new(1.0, 2.0));
    }
}
