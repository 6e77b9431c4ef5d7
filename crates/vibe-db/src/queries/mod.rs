mod accounts;
mod comments;
mod communities;
mod follows;
mod groups;
mod media;
mod posts;

use anyhow::Result;
use rusqlite::types::ToSql;

/// Numbered placeholders `?start, ?start+1, ...` for an `IN (...)` list.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn to_sql_params(values: &[String]) -> Vec<&dyn ToSql> {
    values.iter().map(|v| v as &dyn ToSql).collect()
}

/// `LIKE` pattern matching `term` anywhere, with `\`, `%` and `_` taken
/// literally. Pair with `ESCAPE '\'`.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(contains_pattern("swim"), "%swim%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::Database;
    use crate::models::{AccountRow, NewAccount};

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn account(db: &Database, id: &str, phone: &str) -> AccountRow {
        db.create_account(&NewAccount {
            id,
            username: None,
            phone_number: phone,
            email: None,
            first_name: "Ama",
            last_name: "",
            password_hash: "hash",
        })
        .unwrap()
    }
}
