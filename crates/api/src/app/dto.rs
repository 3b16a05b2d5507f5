use serde::Deserialize;
use serde_json::Value as JsonValue;

use storefront_core::{Filter, FilterValue, FindConfig};

// -------------------------
// Query-string DTOs
// -------------------------

/// `?fields=id,title,product.title&expand=product`
#[derive(Debug, Default, Deserialize)]
pub struct ProjectionQuery {
    pub fields: Option<String>,
    pub expand: Option<String>,
}

impl ProjectionQuery {
    pub fn find_config(&self) -> FindConfig {
        FindConfig::new()
            .select(split_list(self.fields.as_deref()))
            .relations(split_list(self.expand.as_deref()))
    }
}

/// `?id=a,b&limit=&offset=&fields=&expand=`
#[derive(Debug, Default, Deserialize)]
pub struct ListVariantsQuery {
    pub id: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub fields: Option<String>,
    pub expand: Option<String>,
}

impl ListVariantsQuery {
    pub fn filter(&self) -> Filter {
        let mut ids = split_list(self.id.as_deref());
        match ids.len() {
            0 => Filter::new(),
            1 => Filter::by_id(ids.remove(0)),
            _ => Filter::new().with(
                "id",
                FilterValue::In(ids.into_iter().map(JsonValue::from).collect()),
            ),
        }
    }

    pub fn find_config(&self) -> FindConfig {
        let mut config = ProjectionQuery {
            fields: self.fields.clone(),
            expand: self.expand.clone(),
        }
        .find_config();
        config.take = self.limit;
        config.skip = self.offset;
        config
    }
}

/// `?limit=&offset=`
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PageQuery {
    pub fn find_config(&self) -> FindConfig {
        FindConfig {
            take: self.limit,
            skip: self.offset,
            ..FindConfig::default()
        }
    }
}

/// Comma-separated list; blanks dropped.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
