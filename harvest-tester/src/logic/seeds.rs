use anyhow::{Result, bail};
use std::collections::HashSet;

/// Seeds swept when the `all` keyword is given.
pub const SWEEP_SEEDS: [u64; 12] = [
    1, 7, 42, 99, 1337, 2024, 4242, 8675, 31_337, 65_535, 0xC0FFEE, 0xDEAD_BEEF,
];

/// Resolve CLI seed arguments into a deduplicated seed list.
///
/// Supports decimal integers (negative values use their magnitude),
/// `0x`-prefixed hex, and the keyword `all` which expands to
/// [`SWEEP_SEEDS`]. An empty input falls back to `1337`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut pending: Vec<u64> = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if token.eq_ignore_ascii_case("all") {
            pending.extend(SWEEP_SEEDS);
            continue;
        }

        if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            match u64::from_str_radix(&hex.replace('_', ""), 16) {
                Ok(value) => pending.push(value),
                Err(_) => bail!("Unrecognized seed token: {token}"),
            }
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            pending.push(value);
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            pending.push(value.unsigned_abs());
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    let mut seen = HashSet::new();
    pending.retain(|seed| seen.insert(*seed));

    if pending.is_empty() {
        pending.push(1337);
    }

    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn resolves_decimal_hex_and_negative() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "-7", "0xff", " 18446744073709551615 "]))
            .unwrap();
        assert_eq!(seeds, vec![42, 7, 255, u64::MAX]);
    }

    #[test]
    fn expands_all_and_dedupes() {
        let seeds = resolve_seed_inputs(&tokens(&["1337", "all", "ALL"])).unwrap();
        assert_eq!(seeds.len(), SWEEP_SEEDS.len());
        assert_eq!(seeds[0], 1337);
    }

    #[test]
    fn empty_input_defaults() {
        assert_eq!(resolve_seed_inputs(&tokens(&["", " "])).unwrap(), vec![1337]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(resolve_seed_inputs(&tokens(&["CL-ORANGE42"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["0xzz"])).is_err());
    }
}
