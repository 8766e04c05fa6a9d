//! Claim codes
//!
//! A claim code is the password an heir types to unseal their claim kit.
//! Generated codes use a 32-symbol alphabet without 0/O or 1/I
//! and are printed in dash-separated groups of four:
//!
//! ```text
//! 7KQM-XR4T-H9WA-C2PE-MZ8B-VN3D   (24 symbols, 120 bits)
//! ```
//!
//! Owners may also choose their own code. [`analyze_claim_code`] estimates
//! its strength so the caller can warn; it is a warning system, not a gate.

use rand::rngs::OsRng;
use rand::Rng;
use std::collections::HashSet;
use zeroize::Zeroizing;

/// Unambiguous alphabet: no 0/O or 1/I.
const ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const CODE_SYMBOLS: usize = 24;
const GROUP_LEN: usize = 4;

/// Minimum recommended entropy for a claim code (bits)
pub const MIN_RECOMMENDED_ENTROPY: f64 = 80.0;

/// Generate a fresh random claim code.
pub fn generate_claim_code() -> Zeroizing<String> {
    let mut rng = OsRng;
    let mut code = Zeroizing::new(String::with_capacity(CODE_SYMBOLS + CODE_SYMBOLS / GROUP_LEN));
    for i in 0..CODE_SYMBOLS {
        if i > 0 && i % GROUP_LEN == 0 {
            code.push('-');
        }
        let idx = rng.gen_range(0..ALPHABET.len());
        code.push(ALPHABET[idx] as char);
    }
    code
}

/// Canonical form used as key-derivation input.
///
/// Codes in the generated shape (24 alphabet symbols, either unbroken or in
/// groups of four separated by dashes or spaces) are case-insensitive and
/// their separators are cosmetic, so `7kqm xr4t ...` and `7KQM-XR4T-...`
/// unseal the same kit. Anything else is an owner-chosen passphrase and is
/// passed through verbatim apart from trimming.
pub fn normalize_claim_code(code: &str) -> Zeroizing<String> {
    let trimmed = code.trim();
    if has_generated_shape(trimmed) {
        Zeroizing::new(
            trimmed
                .chars()
                .filter(|c| !is_separator(*c))
                .map(|c| c.to_ascii_uppercase())
                .collect(),
        )
    } else {
        Zeroizing::new(trimmed.to_string())
    }
}

fn is_separator(c: char) -> bool {
    c == '-' || c.is_ascii_whitespace()
}

fn has_generated_shape(code: &str) -> bool {
    let in_alphabet = |c: char| c.is_ascii() && ALPHABET.contains(&(c.to_ascii_uppercase() as u8));

    let groups: Vec<&str> = code.split(is_separator).filter(|g| !g.is_empty()).collect();
    let shaped = match groups.as_slice() {
        [single] => single.len() == CODE_SYMBOLS,
        _ => {
            groups.len() == CODE_SYMBOLS / GROUP_LEN
                && groups.iter().all(|g| g.len() == GROUP_LEN)
        }
    };
    shaped && groups.iter().all(|g| g.chars().all(in_alphabet))
}

/// Strength classification of a claim code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CodeStrength {
    /// < 40 bits
    Dangerous,
    /// 40–79 bits
    Weak,
    /// 80–119 bits
    Strong,
    /// ≥ 120 bits
    Excellent,
}

impl CodeStrength {
    pub fn is_recommended(&self) -> bool {
        *self >= Self::Strong
    }
}

/// Result of claim code analysis
#[derive(Debug, Clone)]
pub struct CodeAnalysis {
    pub entropy_bits: f64,
    pub strength: CodeStrength,
    pub warnings: Vec<String>,
}

/// Estimate the entropy of a claim code.
///
/// Codes in generated form are scored by alphabet size. Anything else is
/// scored by character classes with a penalty for repeated symbols.
pub fn analyze_claim_code(code: &str) -> CodeAnalysis {
    let normalized = normalize_claim_code(code);
    let mut warnings = Vec::new();

    if normalized.is_empty() {
        return CodeAnalysis {
            entropy_bits: 0.0,
            strength: CodeStrength::Dangerous,
            warnings: vec!["Claim code is empty".to_string()],
        };
    }

    let symbols: Vec<char> = normalized.chars().collect();
    let len = symbols.len() as f64;

    let generated_form = has_generated_shape(&normalized);

    let charset_size: f64 = if generated_form {
        ALPHABET.len() as f64
    } else {
        let mut size = 0.0;
        if symbols.iter().any(|c| c.is_ascii_lowercase()) {
            size += 26.0;
        }
        if symbols.iter().any(|c| c.is_ascii_uppercase()) {
            size += 26.0;
        }
        if symbols.iter().any(|c| c.is_ascii_digit()) {
            size += 10.0;
        }
        if symbols
            .iter()
            .any(|c| c.is_ascii_punctuation() || *c == ' ')
        {
            size += 33.0;
        }
        if symbols.iter().any(|c| !c.is_ascii()) {
            size += 100.0;
        }
        f64::max(size, 1.0)
    };

    let mut entropy = len * charset_size.log2();

    let unique: HashSet<char> = symbols.iter().copied().collect();
    let unique_ratio = unique.len() as f64 / len;
    if unique_ratio < 0.5 {
        entropy -= (1.0 - unique_ratio) * entropy * 0.3;
        warnings.push("Too many repeated characters".to_string());
    }

    if symbols.len() < 12 {
        warnings.push("Claim code is short (< 12 characters)".to_string());
    }

    let strength = if entropy < 40.0 {
        CodeStrength::Dangerous
    } else if entropy < MIN_RECOMMENDED_ENTROPY {
        CodeStrength::Weak
    } else if entropy < 120.0 {
        CodeStrength::Strong
    } else {
        CodeStrength::Excellent
    };

    if !strength.is_recommended() {
        warnings.push(format!(
            "Below recommended {:.0} bits; an heir's kit could be brute-forced",
            MIN_RECOMMENDED_ENTROPY
        ));
    }

    CodeAnalysis {
        entropy_bits: entropy,
        strength,
        warnings,
    }
}
