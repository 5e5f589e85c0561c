use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use super::{FieldKind, FieldSpec, Listable};
use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 25;
pub const MAX_LIMIT: u32 = 100;

const RESERVED: [&str; 4] = ["select", "sort", "page", "limit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
}

impl FilterOp {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "eq" => FilterOp::Eq,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            "contains" => FilterOp::Contains,
            _ => return None,
        })
    }

    fn allowed_for(self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Text | FieldKind::LowercaseText => true,
            FieldKind::Timestamp => self != FilterOp::Contains,
            FieldKind::Uuid | FieldKind::Enum { .. } | FieldKind::UuidList => {
                matches!(self, FilterOp::Eq | FilterOp::In)
            }
            FieldKind::Search(_) => self == FilterOp::Eq,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Uuid(Uuid),
    Timestamp(OffsetDateTime),
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: &'static FieldSpec,
    pub op: FilterOp,
    /// Exactly one value unless `op` is `In`.
    pub values: Vec<FilterValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub field: &'static FieldSpec,
    pub direction: Direction,
}

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    /// `None` returns every field.
    pub select: Option<Vec<&'static str>>,
    pub sort: Vec<SortKey>,
    pub page: u32,
    pub limit: u32,
}

impl ListQuery {
    pub fn parse<R: Listable>(pairs: &[(String, String)]) -> AppResult<Self> {
        let mut filters = Vec::new();
        let mut select = None;
        let mut sort = None;
        let mut page = DEFAULT_PAGE;
        let mut limit = DEFAULT_LIMIT;

        for (key, value) in pairs {
            match key.as_str() {
                "select" => select = Some(parse_select::<R>(value)?),
                "sort" => sort = Some(parse_sort::<R>(value)?),
                "page" => page = parse_page(value),
                "limit" => limit = parse_limit(value),
                _ => filters.push(parse_filter::<R>(key, value)?),
            }
        }

        let sort = match sort {
            Some(keys) if !keys.is_empty() => keys,
            _ => parse_sort::<R>(R::DEFAULT_SORT)?,
        };

        Ok(Self {
            filters,
            select,
            sort,
            page,
            limit,
        })
    }

    /// Adds an equality filter the caller cannot override, e.g. the owner of a nested listing.
    pub fn require<R: Listable>(&mut self, field: &str, value: FilterValue) -> AppResult<()> {
        let spec = R::field(field).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("{} has no field {field}", R::TABLE))
        })?;
        self.filters.push(Filter {
            field: spec,
            op: FilterOp::Eq,
            values: vec![value],
        });
        Ok(())
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

fn parse_page(raw: &str) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 1 => n.min(i64::from(u32::MAX)) as u32,
        _ => DEFAULT_PAGE,
    }
}

fn parse_limit(raw: &str) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 1 => n.min(i64::from(MAX_LIMIT)) as u32,
        _ => DEFAULT_LIMIT,
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_select<R: Listable>(raw: &str) -> AppResult<Vec<&'static str>> {
    split_list(raw)
        .map(|name| match R::field(name) {
            Some(spec) if spec.selectable => Ok(spec.name),
            _ => Err(AppError::BadRequest(format!("Cannot select field '{name}'"))),
        })
        .collect()
}

fn parse_sort<R: Listable>(raw: &str) -> AppResult<Vec<SortKey>> {
    split_list(raw)
        .map(|item| {
            let (name, direction) = match item.strip_prefix('-') {
                Some(rest) => (rest, Direction::Desc),
                None => (item.strip_prefix('+').unwrap_or(item), Direction::Asc),
            };
            match R::field(name) {
                Some(spec) if spec.sortable => Ok(SortKey {
                    field: spec,
                    direction,
                }),
                _ => Err(AppError::BadRequest(format!("Cannot sort by field '{name}'"))),
            }
        })
        .collect()
}

/// `name=value` or `name[op]=value`.
fn split_key(key: &str) -> AppResult<(&str, FilterOp)> {
    let Some(open) = key.find('[') else {
        return Ok((key, FilterOp::Eq));
    };
    let op = key[open + 1..]
        .strip_suffix(']')
        .and_then(FilterOp::parse)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid filter operator in '{key}'")))?;
    Ok((&key[..open], op))
}

fn parse_filter<R: Listable>(key: &str, raw: &str) -> AppResult<Filter> {
    let (name, op) = split_key(key)?;
    if RESERVED.contains(&name) {
        return Err(AppError::BadRequest(format!("Invalid filter '{key}'")));
    }
    let field = R::field(name)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown filter field '{name}'")))?;
    if !op.allowed_for(field.kind) {
        return Err(AppError::BadRequest(format!(
            "Operator not supported for field '{name}'"
        )));
    }

    let values = if op == FilterOp::In {
        split_list(raw)
            .map(|item| parse_value(field, item))
            .collect::<AppResult<Vec<_>>>()?
    } else {
        vec![parse_value(field, raw)?]
    };
    if values.is_empty() {
        return Err(AppError::BadRequest(format!("Filter '{key}' needs a value")));
    }

    Ok(Filter { field, op, values })
}

fn parse_value(field: &FieldSpec, raw: &str) -> AppResult<FilterValue> {
    let invalid = || AppError::BadRequest(format!("Invalid value '{raw}' for field '{}'", field.name));
    match field.kind {
        FieldKind::Text | FieldKind::Search(_) => Ok(FilterValue::Text(raw.to_string())),
        FieldKind::LowercaseText => Ok(FilterValue::Text(raw.trim().to_lowercase())),
        FieldKind::Uuid | FieldKind::UuidList => {
            Uuid::parse_str(raw.trim()).map(FilterValue::Uuid).map_err(|_| invalid())
        }
        FieldKind::Timestamp => parse_timestamp(raw).map(FilterValue::Timestamp).ok_or_else(invalid),
        FieldKind::Enum { variants, .. } => variants
            .iter()
            .find(|v| **v == raw)
            .map(|v| FilterValue::Text((*v).to_string()))
            .ok_or_else(invalid),
    }
}

/// RFC 3339, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}
