//! Join resolution
//!
//! Given the tables a query needs and the relationships declared between them, works out
//! which table goes in the FROM clause and which JOINs connect every other table to it.
//!
//! ```text
//! anchor  = primary extraction table, else first table requested
//! pairs   = for each pair of tables: all joins between them, combined with AND,
//!           else the key pairs of the first lookup between them
//! ordered = repeatedly take the first pair with exactly one side already joined
//! ```

use crate::catalogue::{ExtractionJoinType, JoinInfo, Relationships, TableInfo};
use crate::domain::{QueryBuildingError, TableInfoId};
use std::sync::Arc;

/// One JOIN line of the assembled query
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedJoin {
    /// The table introduced by this JOIN
    pub table: Arc<TableInfo>,

    /// Join type as written, already inverted when joining from the primary key side
    pub join_type: ExtractionJoinType,

    /// The declared joins combined into this line (more than one for composite joins)
    pub join_infos: Vec<JoinInfo>,
}

impl ResolvedJoin {
    pub fn on_sql(&self) -> String {
        self.join_infos
            .iter()
            .map(JoinInfo::on_sql)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    pub fn to_sql(&self) -> String {
        format!("{} JOIN {} ON {}", self.join_type, self.table.name, self.on_sql())
    }

    pub fn is_composite(&self) -> bool {
        self.join_infos.len() > 1
    }
}

/// Outcome of join resolution
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    pub anchor: Arc<TableInfo>,

    /// Every table in the order it enters the query, anchor first
    pub tables: Vec<Arc<TableInfo>>,

    pub joins: Vec<ResolvedJoin>,
}

/// All joins between one pair of tables, validated to form a single ON clause
#[derive(Debug)]
struct PairJoin {
    foreign_key_table: TableInfoId,
    primary_key_table: TableInfoId,
    join_type: ExtractionJoinType,
    join_infos: Vec<JoinInfo>,
}

/// Resolves the FROM table and JOIN order for `tables`
///
/// `tables` must be non-empty and listed in order of first use.
pub(crate) fn resolve_joins(
    tables: &[Arc<TableInfo>],
    relationships: &Relationships,
) -> Result<JoinPlan, QueryBuildingError> {
    let anchor = choose_anchor(tables)?;

    if tables.len() == 1 {
        return Ok(JoinPlan {
            anchor: anchor.clone(),
            tables: vec![anchor],
            joins: Vec::new(),
        });
    }

    let mut pairs = Vec::new();
    for (i, left) in tables.iter().enumerate() {
        for right in &tables[i + 1..] {
            let mut join_infos: Vec<JoinInfo> = relationships
                .joins_between(left.id, right.id)
                .into_iter()
                .cloned()
                .collect();
            if join_infos.is_empty() {
                if let Some(lookup) = relationships.lookups_between(left.id, right.id).first() {
                    join_infos = lookup.as_join_infos();
                }
            }
            if !join_infos.is_empty() {
                pairs.push(combine_pair(left, right, join_infos)?);
            }
        }
    }

    let table = |id: TableInfoId| tables.iter().find(|t| t.id == id).cloned();

    let mut included = vec![anchor.clone()];
    let mut joins = Vec::new();
    loop {
        let is_included = |id: TableInfoId| included.iter().any(|t| t.id == id);
        let next = pairs.iter().position(|p| {
            is_included(p.foreign_key_table) != is_included(p.primary_key_table)
        });
        let Some(index) = next else { break };
        let pair = pairs.remove(index);

        let (joined, join_type) = if is_included(pair.foreign_key_table) {
            (pair.primary_key_table, pair.join_type)
        } else {
            (pair.foreign_key_table, pair.join_type.inverse())
        };
        let Some(joined) = table(joined) else { break };

        joins.push(ResolvedJoin {
            table: joined.clone(),
            join_type,
            join_infos: pair.join_infos,
        });
        included.push(joined);

        pairs.retain(|p| {
            let redundant = included.iter().any(|t| t.id == p.foreign_key_table)
                && included.iter().any(|t| t.id == p.primary_key_table);
            if redundant {
                tracing::debug!(
                    foreign_key_table = %p.foreign_key_table,
                    primary_key_table = %p.primary_key_table,
                    "Skipping join between tables that are already joined"
                );
            }
            !redundant
        });
    }

    let unjoined: Vec<&Arc<TableInfo>> = tables
        .iter()
        .filter(|t| !included.iter().any(|i| i.id == t.id))
        .collect();

    if !unjoined.is_empty() {
        return Err(QueryBuildingError::UnjoinedTables {
            table_count: tables.len(),
            tables: names(tables.iter()),
            anchor: anchor.name.clone(),
            unjoined: names(unjoined.into_iter()),
            lookup_count: relationships.lookups.len(),
            join_count: relationships.joins.len(),
        });
    }

    Ok(JoinPlan {
        anchor,
        tables: included,
        joins,
    })
}

fn choose_anchor(tables: &[Arc<TableInfo>]) -> Result<Arc<TableInfo>, QueryBuildingError> {
    let primaries: Vec<&Arc<TableInfo>> = tables
        .iter()
        .filter(|t| t.is_primary_extraction_table)
        .collect();

    match primaries.as_slice() {
        [] => tables
            .first()
            .cloned()
            .ok_or(QueryBuildingError::NoColumns),
        [primary] => Ok(Arc::clone(primary)),
        many => Err(QueryBuildingError::MultiplePrimaryExtractionTables {
            tables: names(many.iter().copied()),
        }),
    }
}

/// Validates that every join between `left` and `right` can be ANDed into one ON clause
fn combine_pair(
    left: &TableInfo,
    right: &TableInfo,
    join_infos: Vec<JoinInfo>,
) -> Result<PairJoin, QueryBuildingError> {
    let first = &join_infos[0];

    let mixed_directions = join_infos
        .iter()
        .any(|j| j.foreign_key_table() != first.foreign_key_table());
    if mixed_directions {
        let directions = join_infos
            .iter()
            .map(|j| format!("{} -> {}", j.foreign_key.table.name, j.primary_key.table.name))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(QueryBuildingError::ConflictingJoinDirections {
            count: join_infos.len(),
            left: left.name.clone(),
            right: right.name.clone(),
            directions,
        });
    }

    if join_infos.iter().any(|j| j.join_type != first.join_type) {
        let join_types = join_infos
            .iter()
            .map(|j| j.join_type.keyword())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(QueryBuildingError::AmbiguousJoinTypes {
            left: left.name.clone(),
            right: right.name.clone(),
            join_types,
        });
    }

    Ok(PairJoin {
        foreign_key_table: first.foreign_key_table(),
        primary_key_table: first.primary_key_table(),
        join_type: first.join_type,
        join_infos,
    })
}

fn names<'a>(tables: impl Iterator<Item = &'a Arc<TableInfo>>) -> String {
    tables.map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
}
