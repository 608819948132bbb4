use super::models::TaskPage;
use crate::engine::Task;

const DEFAULT_PAGE: usize = 1;
const DEFAULT_PAGE_SIZE: usize = 10;

/// Normalized page request. Never fails: bad input falls back to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self {
            page: positive_or(page, DEFAULT_PAGE),
            page_size: positive_or(page_size, DEFAULT_PAGE_SIZE),
        }
    }

    /// Slice an already filtered, ordered task list
    pub fn paginate(&self, tasks: Vec<Task>) -> TaskPage {
        let total = tasks.len();
        let page_size = self.page_size.max(1);
        let start = self.page.saturating_sub(1).saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);

        let tasks = tasks.into_iter().skip(start).take(end - start).collect();

        TaskPage {
            tasks,
            total,
            page: self.page,
            page_size,
            total_pages: total.div_ceil(page_size),
        }
    }
}

fn positive_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(default)
}
