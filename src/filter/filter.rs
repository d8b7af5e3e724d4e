use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{Condition, FilterOrderInfo, FilterValue, SortDirection, SqlResult};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct Filter {
    table_name: &'static str,
    conditions: Vec<Condition>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: &'static str) -> Result<Self, FilterError> {
        Self::validate_identifier(table_name).map_err(|_| FilterError::InvalidTableName(table_name.to_string()))?;
        Ok(Self {
            table_name,
            conditions: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn table_name(&self) -> &'static str {
        self.table_name
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<FilterValue>) -> Result<Self, FilterError> {
        Self::validate_column(column)?;
        self.conditions.push(Condition::Eq { column, value: value.into() });
        Ok(self)
    }

    pub fn not_expired(mut self, column: &'static str, at: DateTime<Utc>) -> Result<Self, FilterError> {
        Self::validate_column(column)?;
        self.conditions.push(Condition::NotExpired { column, at });
        Ok(self)
    }

    pub fn order(mut self, column: &'static str, sort: SortDirection) -> Result<Self, FilterError> {
        Self::validate_column(column)?;
        self.order_data.push(FilterOrderInfo { column, sort });
        Ok(self)
    }

    pub fn limit(mut self, limit: i64, offset: Option<i64>) -> Result<Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, 0);
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    fn validate_column(column: &str) -> Result<(), FilterError> {
        Self::validate_identifier(column).map_err(|_| FilterError::InvalidColumn(column.to_string()))
    }

    fn validate_identifier(name: &str) -> Result<(), ()> {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
            _ => return Err(()),
        }
        if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            Ok(())
        } else {
            Err(())
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}
