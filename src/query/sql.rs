use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Direction, FieldKind, FieldSpec, Filter, FilterOp, FilterValue, ListQuery, Listable};

/// `SELECT <columns> FROM <table> WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
pub fn select_query<R: Listable>(q: &ListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", R::COLUMNS, R::TABLE));
    push_where(&mut qb, &q.filters);
    push_order(&mut qb, q);
    qb.push(" LIMIT ")
        .push_bind(i64::from(q.limit))
        .push(" OFFSET ")
        .push_bind(q.offset());
    qb
}

/// Row count for the same filters, ignoring sort and pagination.
pub fn count_query<R: Listable>(q: &ListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", R::TABLE));
    push_where(&mut qb, &q.filters);
    qb
}

/// Runs the page query and the matching count.
pub async fn fetch_page<R>(db: &PgPool, q: &ListQuery) -> anyhow::Result<(Vec<R>, i64)>
where
    R: Listable + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let rows = select_query::<R>(q)
        .build_query_as::<R>()
        .fetch_all(db)
        .await?;
    let (total,) = count_query::<R>(q)
        .build_query_as::<(i64,)>()
        .fetch_one(db)
        .await?;
    Ok((rows, total))
}

fn push_where(qb: &mut QueryBuilder<'static, Postgres>, filters: &[Filter]) {
    qb.push(" WHERE TRUE");
    for filter in filters {
        qb.push(" AND ");
        push_filter(qb, filter);
    }
}

fn push_order(qb: &mut QueryBuilder<'static, Postgres>, q: &ListQuery) {
    qb.push(" ORDER BY ");
    for key in &q.sort {
        qb.push(key.field.column).push(match key.direction {
            Direction::Asc => " ASC, ",
            Direction::Desc => " DESC, ",
        });
    }
    // stable pages when sort values tie
    qb.push("id ASC");
}

fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
    let field = filter.field;
    match (field.kind, filter.op) {
        (FieldKind::Search(columns), _) => {
            let pattern = like_pattern(first_text(&filter.values));
            qb.push("(");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
            }
            qb.push(")");
        }
        (FieldKind::UuidList, FilterOp::In) => {
            let ids: Vec<Uuid> = filter
                .values
                .iter()
                .filter_map(|v| match v {
                    FilterValue::Uuid(id) => Some(*id),
                    _ => None,
                })
                .collect();
            qb.push(field.column).push(" && ").push_bind(ids);
        }
        (FieldKind::UuidList, _) => {
            if let Some(FilterValue::Uuid(id)) = filter.values.first() {
                qb.push_bind(*id).push(" = ANY(").push(field.column).push(")");
            } else {
                qb.push("FALSE");
            }
        }
        (_, FilterOp::In) => {
            qb.push(field.column).push(" IN (");
            for (i, value) in filter.values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, field, value);
            }
            qb.push(")");
        }
        (_, FilterOp::Contains) => {
            qb.push(field.column)
                .push(" ILIKE ")
                .push_bind(like_pattern(first_text(&filter.values)));
        }
        (_, op) => {
            qb.push(field.column).push(comparison(op));
            match filter.values.first() {
                Some(value) => push_value(qb, field, value),
                None => {
                    qb.push("NULL");
                }
            }
        }
    }
}

fn comparison(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Gt => " > ",
        FilterOp::Gte => " >= ",
        FilterOp::Lt => " < ",
        FilterOp::Lte => " <= ",
        FilterOp::Eq | FilterOp::In | FilterOp::Contains => " = ",
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, field: &FieldSpec, value: &FilterValue) {
    match value {
        FilterValue::Text(s) => qb.push_bind(s.clone()),
        FilterValue::Uuid(id) => qb.push_bind(*id),
        FilterValue::Timestamp(ts) => qb.push_bind(*ts),
    };
    if let FieldKind::Enum { type_name, .. } = field.kind {
        qb.push("::").push(type_name);
    }
}

fn first_text(values: &[FilterValue]) -> &str {
    match values.first() {
        Some(FilterValue::Text(s)) => s,
        _ => "",
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}
