//! Reading composite keys back on the fetch side.

use climscape_core::SourceError;
use climscape_storage::CompositeKey;

use crate::error::{ResultsError, ResultsResult};

fn malformed(key: &CompositeKey, expected: usize, got: usize) -> ResultsError {
    SourceError::MalformedKey {
        key: key.to_string(),
        expected,
        got,
    }
    .into()
}

/// The `N` tokens of `key`, absent ones as `None`.
pub(crate) fn key_tokens<const N: usize>(key: &CompositeKey) -> ResultsResult<[Option<&str>; N]> {
    let tokens = key
        .expect_arity(N)
        .map_err(|(expected, got)| malformed(key, expected, got))?;
    Ok(std::array::from_fn(|i| tokens[i].as_deref()))
}

/// The `N` tokens of `key`, all of which must be present.
pub(crate) fn present_tokens<const N: usize>(key: &CompositeKey) -> ResultsResult<[&str; N]> {
    let tokens = key_tokens::<N>(key)?;
    let present = tokens.iter().flatten().count();
    if present != N {
        return Err(malformed(key, N, present));
    }
    Ok(tokens.map(Option::unwrap_or_default))
}

/// Key of a comparison: the first token is scenario A, the second an
/// optional scenario B, the remaining `N - 2` are required.
pub(crate) fn comparison_tokens<const N: usize>(
    key: &CompositeKey,
) -> ResultsResult<(&str, Option<&str>, Vec<&str>)> {
    let tokens = key_tokens::<N>(key)?;
    let rest: Vec<&str> = tokens[2..].iter().flatten().copied().collect();
    match tokens[0] {
        Some(a) if rest.len() == N - 2 => Ok((a, tokens[1], rest)),
        _ => Err(malformed(key, N, tokens.iter().flatten().count())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_tokens() {
        let key = CompositeKey::of(&["base", "T", "1_0-2_5-0_0"]).unwrap();
        let [scenario, variable, point] = present_tokens::<3>(&key).unwrap();
        assert_eq!((scenario, variable, point), ("base", "T", "1_0-2_5-0_0"));

        let partial = CompositeKey::new([Some("base"), None, Some("x")]).unwrap();
        assert_eq!(
            present_tokens::<3>(&partial),
            Err(ResultsError::Source(SourceError::MalformedKey {
                key: "base;_;x".to_string(),
                expected: 3,
                got: 2,
            }))
        );
    }

    #[test]
    fn test_wrong_arity() {
        let key = CompositeKey::of(&["a", "b"]).unwrap();
        assert!(matches!(
            key_tokens::<4>(&key),
            Err(ResultsError::Source(SourceError::MalformedKey {
                expected: 4,
                got: 2,
                ..
            }))
        ));
    }

    #[test]
    fn test_comparison_tokens() {
        let key = CompositeKey::new([Some("a"), None, Some("T"), Some("p")]).unwrap();
        let (a, b, rest) = comparison_tokens::<4>(&key).unwrap();
        assert_eq!((a, b, rest), ("a", None, vec!["T", "p"]));

        let missing_a = CompositeKey::new([None, Some("b"), Some("T"), Some("p")]).unwrap();
        assert!(comparison_tokens::<4>(&missing_a).is_err());
    }
}
