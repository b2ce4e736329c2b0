// src/models/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

// Parâmetros de paginação (offset/limit) vindos da query string
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for PageParams {
    fn default() -> Self {
        Self { offset: 0, limit: DEFAULT_LIMIT }
    }
}

impl PageParams {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }.normalized()
    }

    /// Garante offset >= 0 e 1 <= limit <= MAX_LIMIT.
    pub fn normalized(self) -> Self {
        Self {
            offset: self.offset.max(0),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Aplica a janela em uma lista já filtrada e ordenada (usado pelo store em memória).
    pub fn slice<T: Clone>(&self, rows: &[T]) -> Vec<T> {
        let page = self.normalized();
        rows.iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect()
    }
}

// Resposta paginada: o total vem do mesmo predicado usado na busca
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        let params = params.normalized();
        Self { items, total, offset: params.offset, limit: params.limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_out_of_range_values() {
        let p = PageParams::new(-5, 10_000);
        assert_eq!(p.offset, 0);
        assert_eq!(p.limit, MAX_LIMIT);

        let p = PageParams::new(3, 0);
        assert_eq!(p.limit, 1);
    }

    #[test]
    fn slices_the_requested_window() {
        let rows: Vec<i32> = (1..=10).collect();
        assert_eq!(PageParams::new(8, 5).slice(&rows), vec![9, 10]);
        assert!(PageParams::new(20, 5).slice(&rows).is_empty());
    }
}
