//! Column discovery and value alias tables.
//!
//! The source sheets are edited by hand and the same logical column shows up
//! under several spellings (accents dropped, different casing, reworded
//! questions). Matching is exact after trimming; the first candidate present
//! wins. There is deliberately no fuzzy matching.

use crate::config::{ColumnMap, ResolvedColumn};

pub const TIMESTAMP_COLUMN: &str = "Marca temporal";
pub const FULL_NAME_COLUMN: &str = "Nombres y apellidos completos";
pub const PHONE_COLUMN: &str = "No. de Celular";
pub const AGE_GROUP_COLUMN: &str = "Tú eres:";
pub const INVITER_COLUMN: &str = "Quién te Invito?";
pub const NEIGHBORHOOD_COLUMN: &str = "¿En qué barrio vives?";
pub const CALL_COLUMN: &str = "Llamada realizada y contestada (SI/NO)";
pub const SMALL_GROUP_COLUMN: &str = "Ubicado en célula o Grupo Go! (SI/NO)";
pub const VISIT_COLUMN: &str = "Visita realizada (SI/NO)";

/// Accepted spellings for the leader-identity column, in priority order.
pub static LEADER_COLUMNS: &[&str] = &[
    "Líder Principal",
    "LIDER DE DOCE",
    "Lider Principal",
    "LÍDER PRINCIPAL",
];

/// Accepted spellings for the meeting column, in priority order.
pub static MEETING_COLUMNS: &[&str] = &[
    "¿A qué reunión viniste?",
    "¿A que reunión viniste?",
    "Reunión",
    "REUNION",
];

/// Canonical affirmative token.
pub const YES: &str = "SI";
/// Canonical negative token.
pub const NO: &str = "NO";

// Alias tables applied after trim + uppercase. "SÌ" carries a grave accent,
// which shows up in sheets filled in from Italian keyboard layouts.
static YES_ALIASES: &[&str] = &["SI", "SÍ", "SÌ", "YES", "Y", "S", "1", "TRUE"];
static NO_ALIASES: &[&str] = &["NO", "N", "0", "FALSE", "SIN GESTIÓN", "SIN GESTION"];

/// Fixed placeholder for a missing neighborhood, so that it participates in
/// the frequency counts as an explicit bucket.
pub const UNSPECIFIED: &str = "No especificado";

fn find(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn find_first(headers: &[String], candidates: &[&str]) -> Option<ResolvedColumn> {
    for cand in candidates {
        if let Some(index) = find(headers, cand) {
            return Some(ResolvedColumn {
                index,
                header: cand.to_string(),
            });
        }
    }
    None
}

/// Resolves the column bindings once, from trimmed header names.
pub fn resolve_columns(headers: &[String]) -> ColumnMap {
    ColumnMap {
        timestamp: find(headers, TIMESTAMP_COLUMN),
        full_name: find(headers, FULL_NAME_COLUMN),
        phone: find(headers, PHONE_COLUMN),
        age_group: find(headers, AGE_GROUP_COLUMN),
        inviter: find(headers, INVITER_COLUMN),
        neighborhood: find(headers, NEIGHBORHOOD_COLUMN),
        call_made: find(headers, CALL_COLUMN),
        in_small_group: find(headers, SMALL_GROUP_COLUMN),
        visit_made: find(headers, VISIT_COLUMN),
        leader: find_first(headers, LEADER_COLUMNS),
        meeting: find_first(headers, MEETING_COLUMNS),
    }
}

/// Normalizes one yes/no value: trim, uppercase, then map through the alias
/// tables. Text matching neither table passes through verbatim — unrecognized
/// free text is a data-quality signal that must stay visible, it is not
/// coerced to "NO".
///
/// This function is idempotent.
pub fn normalize_flag(raw: &str) -> String {
    let value = raw.trim().to_uppercase();
    if YES_ALIASES.contains(&value.as_str()) {
        YES.to_string()
    } else if NO_ALIASES.contains(&value.as_str()) {
        NO.to_string()
    } else {
        value
    }
}

/// Title-cases a free-text category: first letter of each word uppercased,
/// the rest lowercased.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn leader_column_priority_order() {
        // Both spellings present: the first candidate in the list wins.
        let h = headers(&["LIDER DE DOCE", "Líder Principal"]);
        let cols = resolve_columns(&h);
        let leader = cols.leader.unwrap();
        assert_eq!(leader.header, "Líder Principal");
        assert_eq!(leader.index, 1);
    }

    #[test]
    fn leader_column_fallback() {
        let h = headers(&["Marca temporal", "LIDER DE DOCE"]);
        let cols = resolve_columns(&h);
        assert_eq!(cols.leader.unwrap().index, 1);
        assert_eq!(cols.timestamp, Some(0));
    }

    #[test]
    fn absent_columns_stay_absent() {
        let h = headers(&["Marca temporal"]);
        let cols = resolve_columns(&h);
        assert!(cols.leader.is_none());
        assert!(cols.meeting.is_none());
        assert!(cols.age_group.is_none());
        assert!(cols.call_made.is_none());
    }

    #[test]
    fn flag_affirmative_aliases() {
        for v in ["Sí", "sí", " SI ", "yes", "y", "s", "1", "TRUE", "SÌ"] {
            assert_eq!(normalize_flag(v), "SI", "alias: {:?}", v);
        }
    }

    #[test]
    fn flag_negative_aliases() {
        for v in ["no", "N", "0", "false", "Sin gestión", "sin gestion"] {
            assert_eq!(normalize_flag(v), "NO", "alias: {:?}", v);
        }
    }

    #[test]
    fn flag_residual_passes_through() {
        assert_eq!(normalize_flag("maybe"), "MAYBE");
        assert_eq!(normalize_flag(" pendiente "), "PENDIENTE");
        assert_eq!(normalize_flag(""), "");
    }

    #[test]
    fn flag_normalization_is_idempotent() {
        for v in ["Sí", "no", "maybe", "sin gestión", "", "  y  "] {
            let once = normalize_flag(v);
            assert_eq!(normalize_flag(&once), once);
        }
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("san felipe"), "San Felipe");
        assert_eq!(title_case("  EL CENTRO  "), "El Centro");
        assert_eq!(title_case(""), "");
    }
}
