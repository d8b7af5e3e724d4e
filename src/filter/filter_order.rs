use super::types::FilterOrderInfo;

pub struct FilterOrder;

impl FilterOrder {
    pub fn generate(order: &[FilterOrderInfo]) -> String {
        if order.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = order
            .iter()
            .map(|o| format!("\"{}\" {}", o.column, o.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
