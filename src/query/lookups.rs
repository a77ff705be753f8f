//! Lookup description resolution and alias assignment
//!
//! A requested column that is the description of a [`Lookup`] is not selected from its own
//! table; instead the lookup table is joined under an alias (`lookup_1`, `lookup_2`, ...) and
//! the description is selected through that alias. Aliases are keyed by the pair
//! (lookup table, foreign key column), so the same lookup table reached through two different
//! foreign keys is joined twice, while several descriptions reached through the same foreign
//! key share one join.

use super::column::QueryColumn;
use crate::catalogue::{Lookup, Relationships};
use crate::domain::{ColumnInfoId, TableInfoId};

const LOOKUP_ALIAS_PREFIX: &str = "lookup_";

/// A lookup table joined under an alias
#[derive(Debug, Clone, PartialEq)]
pub struct LookupAlias {
    pub alias: String,

    /// The lookup that first claimed this alias; its keys drive the JOIN
    pub lookup: Lookup,
}

impl LookupAlias {
    pub fn join_sql(&self) -> String {
        format!(
            "{} JOIN {} AS {} ON {}",
            self.lookup.join_type,
            self.lookup.primary_key.table.name,
            self.alias,
            self.lookup.on_sql(&self.alias)
        )
    }

    fn key(&self) -> (TableInfoId, ColumnInfoId) {
        (self.lookup.lookup_table(), self.lookup.foreign_key.id)
    }
}

/// Lookup status of every requested column
#[derive(Debug, Clone, Default)]
pub(crate) struct LookupResolution {
    /// Parallel to the ordered column list: index into `aliases` for description columns
    pub column_aliases: Vec<Option<usize>>,
    pub aliases: Vec<LookupAlias>,
}

/// Decides which lookup (if any) each column describes and assigns aliases in column order
pub(crate) fn resolve_lookups(columns: &[&QueryColumn], relationships: &Relationships) -> LookupResolution {
    let mut resolution = LookupResolution::default();

    for (position, column) in columns.iter().enumerate() {
        let candidates = relationships.lookups_with_description(column.column.id);
        let Some(chosen) = choose_lookup(&candidates, columns, position) else {
            resolution.column_aliases.push(None);
            continue;
        };

        let key = (chosen.lookup_table(), chosen.foreign_key.id);
        let index = match resolution.aliases.iter().position(|a| a.key() == key) {
            Some(index) => index,
            None => {
                resolution.aliases.push(LookupAlias {
                    alias: format!("{}{}", LOOKUP_ALIAS_PREFIX, resolution.aliases.len() + 1),
                    lookup: chosen.clone(),
                });
                resolution.aliases.len() - 1
            }
        };
        resolution.column_aliases.push(Some(index));
    }

    resolution
}

/// Picks the lookup a description column at `position` belongs to
///
/// With several candidates the lookup whose foreign key is the nearest selected column above
/// the description wins, then any lookup whose foreign key is selected, then the first
/// declared lookup.
fn choose_lookup<'a>(
    candidates: &[&'a Lookup],
    columns: &[&QueryColumn],
    position: usize,
) -> Option<&'a Lookup> {
    match candidates {
        [] => None,
        [only] => Some(*only),
        _ => {
            let selected_at = |id: ColumnInfoId| -> Vec<usize> {
                columns
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.column.id == id)
                    .map(|(i, _)| i)
                    .collect()
            };

            let nearest_preceding = candidates
                .iter()
                .filter_map(|l| {
                    selected_at(l.foreign_key.id)
                        .into_iter()
                        .filter(|&i| i < position)
                        .max()
                        .map(|i| (i, *l))
                })
                .max_by_key(|(i, _)| *i)
                .map(|(_, l)| l);

            nearest_preceding
                .or_else(|| {
                    candidates
                        .iter()
                        .find(|l| !selected_at(l.foreign_key.id).is_empty())
                        .copied()
                })
                .or_else(|| {
                    tracing::debug!(
                        description = %columns[position].column,
                        candidates = candidates.len(),
                        "No foreign key selected for ambiguous lookup description, using first declared lookup"
                    );
                    candidates.first().copied()
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{ColumnInfo, TableInfo};
    use crate::domain::{LookupId, TableInfoId};
    use std::sync::Arc;

    struct Fixture {
        hospital_admitted: ColumnInfo,
        hospital_discharged: ColumnInfo,
        description: ColumnInfo,
        relationships: Relationships,
    }

    fn fixture() -> Fixture {
        let admissions = Arc::new(TableInfo::new(TableInfoId::new(1), "Admissions"));
        let hospitals = Arc::new(TableInfo::new(TableInfoId::new(2), "Hospitals"));
        let col = |id: u32, table: &Arc<TableInfo>, name: &str| {
            ColumnInfo::new(ColumnInfoId::new(id), table.clone(), name, "varchar(10)")
        };

        let hospital_admitted = col(1, &admissions, "hospital_admitted");
        let hospital_discharged = col(2, &admissions, "hospital_discharged");
        let code = col(3, &hospitals, "code");
        let description = col(4, &hospitals, "name");

        let relationships = Relationships::new(
            vec![],
            vec![
                Lookup::new(LookupId::new(1), description.clone(), hospital_admitted.clone(), code.clone()),
                Lookup::new(LookupId::new(2), description.clone(), hospital_discharged.clone(), code),
            ],
        );

        Fixture {
            hospital_admitted,
            hospital_discharged,
            description,
            relationships,
        }
    }

    #[test]
    fn test_non_lookup_columns_have_no_alias() {
        let f = fixture();
        let column = QueryColumn::new(f.hospital_admitted.clone());
        let resolution = resolve_lookups(&[&column], &f.relationships);
        assert_eq!(resolution.column_aliases, vec![None]);
        assert!(resolution.aliases.is_empty());
    }

    #[test]
    fn test_ambiguous_lookup_pairs_with_preceding_foreign_key() {
        let f = fixture();
        let columns = [
            QueryColumn::new(f.hospital_admitted.clone()),
            QueryColumn::new(f.description.clone()).with_alias("admitted_name"),
            QueryColumn::new(f.hospital_discharged.clone()),
            QueryColumn::new(f.description.clone()).with_alias("discharged_name"),
        ];
        let refs: Vec<&QueryColumn> = columns.iter().collect();
        let resolution = resolve_lookups(&refs, &f.relationships);

        assert_eq!(resolution.column_aliases, vec![None, Some(0), None, Some(1)]);
        assert_eq!(resolution.aliases[0].alias, "lookup_1");
        assert_eq!(resolution.aliases[0].lookup.id, LookupId::new(1));
        assert_eq!(resolution.aliases[1].alias, "lookup_2");
        assert_eq!(resolution.aliases[1].lookup.id, LookupId::new(2));
    }

    #[test]
    fn test_ambiguous_lookup_without_foreign_keys_collapses_to_first() {
        let f = fixture();
        let columns = [
            QueryColumn::new(f.description.clone()).with_alias("admitted_name"),
            QueryColumn::new(f.description.clone()).with_alias("discharged_name"),
        ];
        let refs: Vec<&QueryColumn> = columns.iter().collect();
        let resolution = resolve_lookups(&refs, &f.relationships);

        assert_eq!(resolution.column_aliases, vec![Some(0), Some(0)]);
        assert_eq!(resolution.aliases.len(), 1);
        assert_eq!(resolution.aliases[0].lookup.id, LookupId::new(1));
    }

    #[test]
    fn test_join_sql_uses_alias() {
        let f = fixture();
        let column = QueryColumn::new(f.hospital_discharged.clone());
        let description = QueryColumn::new(f.description.clone());
        let resolution = resolve_lookups(&[&column, &description], &f.relationships);

        assert_eq!(
            resolution.aliases[0].join_sql(),
            "LEFT JOIN Hospitals AS lookup_1 ON Admissions.hospital_discharged = lookup_1.code"
        );
    }
}
