// ==========================================
// Layout Exporter - name normalizer
// ==========================================
// Sheet names and column labels become SQL identifier fragments through
// the same transform, so both sides of every comparison agree.
// ==========================================

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize arbitrary human text to a stable identifier fragment.
///
/// Steps, in order: ordinal-sign substitution (`Nº` -> `N`), NFD
/// decomposition with combining-mark removal, uppercase, every character
/// outside `[A-Z0-9]` replaced by `_`, repeated `_` collapsed, leading and
/// trailing `_` trimmed. Idempotent; empty input yields an empty string.
pub fn normalize_identifier(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let replaced = text.replace("Nº", "N").replace("nº", "n");
    let stripped: String = replaced
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut out = String::with_capacity(stripped.len());
    let mut pending_sep = false;
    for c in stripped.to_uppercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            pending_sep = false;
        } else if !pending_sep {
            out.push('_');
            pending_sep = true;
        }
    }

    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accents_and_ordinal_sign() {
        assert_eq!(normalize_identifier("Nº Peça"), "N_PECA");
        assert_eq!(normalize_identifier("Descrição do Material"), "DESCRICAO_DO_MATERIAL");
        assert_eq!(normalize_identifier("Dados Gerais"), "DADOS_GERAIS");
    }

    #[test]
    fn test_separator_collapse_and_trim() {
        assert_eq!(normalize_identifier("  Centro -- Custo  "), "CENTRO_CUSTO");
        assert_eq!(normalize_identifier("___"), "");
    }

    #[test]
    fn test_idempotent() {
        for input in ["Nº Peça", "Dados Gerais", "", "já_NORMALIZADO", "A  B"] {
            let once = normalize_identifier(input);
            assert_eq!(normalize_identifier(&once), once);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_identifier(""), "");
    }
}
