//! ページング情報の調停
//!
//! サーバーのページングブロックはエンドポイントごとにフィールド名が揺れている
//! （`CurrentPage` / `PageNumber`、`Pagination` / `Paginations` など）。
//! 揺れはこのモジュールで吸収し、外には `PaginationDescriptor` だけを出す。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const CURRENT_PAGE_KEYS: &[&str] = &["CurrentPage", "PageNumber", "currentPage", "pageNumber", "page"];
const PAGE_SIZE_KEYS: &[&str] = &["PageSize", "pageSize"];
const TOTAL_ITEMS_KEYS: &[&str] = &["TotalItems", "TotalCount", "totalItems", "totalCount"];
const TOTAL_PAGES_KEYS: &[&str] = &["TotalPages", "totalPages"];

/// 正規化済みのページング情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDescriptor {
    pub current_page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl PaginationDescriptor {
    /// 初期状態（1ページ目、件数0）
    pub fn initial(page_size: u32) -> Self {
        Self::with_flags(1, page_size, 0, 0)
    }

    /// 前後ページの有無を計算して生成
    pub fn with_flags(current_page: u32, page_size: u32, total_items: u64, total_pages: u32) -> Self {
        Self {
            current_page,
            page_size,
            total_items,
            total_pages,
            has_previous_page: current_page > 1,
            has_next_page: current_page < total_pages,
        }
    }

    /// ページ番号だけ差し替える
    pub fn at_page(&self, page: u32) -> Self {
        Self::with_flags(page, self.page_size, self.total_items, self.total_pages)
    }

    /// ページサイズを差し替えて1ページ目に戻す
    pub fn with_page_size(&self, page_size: u32) -> Self {
        let total_pages = total_pages_for(self.total_items, page_size);
        Self::with_flags(1, page_size, self.total_items, total_pages)
    }
}

impl Default for PaginationDescriptor {
    fn default() -> Self {
        Self::initial(crate::resource::DEFAULT_PAGE_SIZE)
    }
}

/// サーバーが返したページングブロック（フィールドはすべて任意）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationBlock {
    pub current_page: Option<u32>,
    pub page_size: Option<u32>,
    pub total_items: Option<u64>,
    pub total_pages: Option<u32>,
}

impl PaginationBlock {
    /// JSONオブジェクトから読み取る
    ///
    /// 認識できるフィールドが1つもなければ None。
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let block = Self::from_map(map);
        if block == Self::default() {
            None
        } else {
            Some(block)
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            current_page: get_number(map, CURRENT_PAGE_KEYS).and_then(|n| u32::try_from(n).ok()),
            page_size: get_number(map, PAGE_SIZE_KEYS).and_then(|n| u32::try_from(n).ok()),
            total_items: get_number(map, TOTAL_ITEMS_KEYS),
            total_pages: get_number(map, TOTAL_PAGES_KEYS).and_then(|n| u32::try_from(n).ok()),
        }
    }
}

/// 実際に要求したページとページサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// 明示指定があればそれを、なければ現在値を使う
    pub fn resolve(page: Option<u32>, page_size: Option<u32>, current: &PaginationDescriptor) -> Self {
        Self {
            page: page.unwrap_or(current.current_page),
            page_size: page_size.unwrap_or(current.page_size),
        }
    }
}

/// list呼び出し後のページング情報を決める
///
/// - サーバーのブロックがあればその値を使う（欠けた項目は要求値・件数から補う）
/// - なければ返ってきた件数と要求したページサイズから計算する
pub fn reconcile(block: Option<&PaginationBlock>, requested: PageRequest, item_count: usize) -> PaginationDescriptor {
    let item_count = item_count as u64;
    match block {
        Some(block) => {
            let page_size = block.page_size.unwrap_or(requested.page_size);
            let total_items = block.total_items.unwrap_or(item_count);
            let total_pages = block
                .total_pages
                .unwrap_or_else(|| total_pages_for(total_items, page_size));
            let current_page = block.current_page.unwrap_or(requested.page);
            PaginationDescriptor::with_flags(current_page, page_size, total_items, total_pages)
        }
        None => {
            let total_pages = total_pages_for(item_count, requested.page_size);
            PaginationDescriptor::with_flags(requested.page, requested.page_size, item_count, total_pages)
        }
    }
}

/// ceil(total_items / page_size)。ページサイズ0なら0
pub fn total_pages_for(total_items: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_items.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

fn get_number(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| {
        let value = map.get(*key)?;
        if let Some(n) = value.as_u64() {
            return Some(n);
        }
        value.as_str().and_then(|s| s.trim().parse().ok())
    })
}
