use serde::Serialize;
use serde_json::Value;

use super::ListQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u32,
    pub limit: u32,
}

/// Links to neighbouring pages; serializes as `{}` when there are none.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl Pagination {
    pub fn compute(page: u32, limit: u32, total: i64) -> Self {
        let start = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let end = i64::from(page) * i64::from(limit);
        Self {
            next: (end < total).then(|| PageRef {
                page: page + 1,
                limit,
            }),
            prev: (start > 0).then(|| PageRef {
                page: page - 1,
                limit,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub success: bool,
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<T>,
}

impl Paginated<Value> {
    /// Serializes `items`, applying the query's `select` projection.
    pub fn build<T: Serialize>(q: &ListQuery, items: Vec<T>, total: i64) -> anyhow::Result<Self> {
        let data = items
            .into_iter()
            .map(|item| -> anyhow::Result<Value> {
                let value = serde_json::to_value(item)?;
                Ok(match &q.select {
                    Some(fields) => project(value, fields),
                    None => value,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            success: true,
            count: data.len(),
            pagination: Pagination::compute(q.page, q.limit, total),
            data,
        })
    }
}

/// Keeps `_id` plus `fields` of a JSON object; other values pass through.
pub fn project(value: Value, fields: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| k == "_id" || fields.contains(&k.as_str()))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_page_of_many_links_next_only() {
        let p = Pagination::compute(1, 25, 60);
        assert_eq!(p.next, Some(PageRef { page: 2, limit: 25 }));
        assert_eq!(p.prev, None);
    }

    #[test]
    fn middle_page_links_both_ways() {
        let p = Pagination::compute(2, 25, 60);
        assert_eq!(p.next, Some(PageRef { page: 3, limit: 25 }));
        assert_eq!(p.prev, Some(PageRef { page: 1, limit: 25 }));
    }

    #[test]
    fn last_exact_page_has_no_next() {
        let p = Pagination::compute(3, 20, 60);
        assert_eq!(p.next, None);
        assert!(p.prev.is_some());
        assert_eq!(serde_json::to_value(Pagination::compute(1, 25, 3)).unwrap(), json!({}));
    }

    #[test]
    fn projection_keeps_id_and_selected() {
        let v = json!({"_id": "1", "title": "Rock", "location": "Stadium", "date": "2025"});
        assert_eq!(project(v, &["title"]), json!({"_id": "1", "title": "Rock"}));
        assert_eq!(project(json!(3), &["title"]), json!(3));
    }
}
