use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&pageSize=` query parameters, clamped to sane bounds.
///
/// Values that do not parse as integers fall back to the defaults instead of
/// rejecting the request.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub page_size: Option<i64>,
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        match self.page_size {
            Some(size) if size > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
            Some(size) if size >= 1 => size,
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        let limit = self.limit();
        PageMeta {
            page: self.page(),
            page_size: limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::Uri};

    fn query(page: Option<i64>, page_size: Option<i64>) -> PageQuery {
        PageQuery { page, page_size }
    }

    #[test]
    fn test_defaults() {
        let q = PageQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(query(Some(0), Some(0)).page(), 1);
        assert_eq!(query(Some(-3), Some(-1)).limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(query(None, Some(500)).limit(), MAX_PAGE_SIZE);
        assert_eq!(query(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_meta() {
        let meta = query(Some(2), Some(10)).meta(25);
        assert_eq!(
            meta,
            PageMeta {
                page: 2,
                page_size: 10,
                total: 25,
                total_pages: 3,
            }
        );
        assert_eq!(query(None, None).meta(0).total_pages, 0);

        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["totalPages"], 3);
    }

    fn from_uri(uri: &str) -> PageQuery {
        let uri: Uri = uri.parse().unwrap();
        Query::<PageQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_query_deserializes_camel_case() {
        let q = from_uri("/users?page=4&pageSize=25");
        assert_eq!(q.page(), 4);
        assert_eq!(q.limit(), 25);
    }

    #[test]
    fn test_non_numeric_query_falls_back_to_defaults() {
        let q = from_uri("/users?page=abc&pageSize=ten");
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), DEFAULT_PAGE_SIZE);

        let q = from_uri("/users?page=2&pageSize=");
        assert_eq!(q.page(), 2);
        assert_eq!(q.limit(), DEFAULT_PAGE_SIZE);
    }
}
