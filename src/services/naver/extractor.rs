//! 市值排行表格解析
//!
//! 列顺序: N | 종목명 | 현재가 | 전일비 | 등락률 | 액면가 | 시가총액 | 상장주식수 |
//! 외국인비율 | 거래량 | PER | ROE | 토론실
//!
//! 解析失败只影响当前行：缺链接、列数不足、必填数字无法解析的行直接跳过

use scraper::{ElementRef, Html, Selector};

use crate::models::{ChangeStatus, StockRecord};

/// 有效数据行的最少单元格数
pub const MIN_CELLS: usize = 12;

/// 页面上表示缺失值的文本
const NOT_AVAILABLE: &str = "N/A";

struct Selectors {
    table: Selector,
    row: Selector,
    cell: Selector,
    link: Selector,
    blind: Selector,
}

impl Selectors {
    fn new() -> Self {
        // 均为字面量选择器，解析失败属于编码错误
        let parse = |css: &str| Selector::parse(css).expect("static selector");
        Self {
            table: parse("table.type_2"),
            row: parse("tr"),
            cell: parse("td"),
            link: parse("a"),
            blind: parse("span.blind"),
        }
    }
}

/// 从页面中提取所有有效行，保持页面顺序
///
/// 找不到 `table.type_2` 时返回空列表
pub fn extract(html: &str) -> Vec<StockRecord> {
    let selectors = Selectors::new();
    let document = Html::parse_document(html);

    let Some(table) = document.select(&selectors.table).next() else {
        log::warn!("未找到市值排行表格(table.type_2)");
        return Vec::new();
    };

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for row in table.select(&selectors.row) {
        let cells: Vec<ElementRef> = row.select(&selectors.cell).collect();
        // 表头、分隔行
        if cells.len() < MIN_CELLS {
            continue;
        }

        match parse_row(&cells, &selectors) {
            Some(record) => records.push(record),
            None => {
                skipped += 1;
                log::debug!("跳过无法解析的行: {}", cell_text(&cells[1]));
            }
        }
    }

    if skipped > 0 {
        log::debug!("共跳过 {} 行", skipped);
    }
    records
}

fn parse_row(cells: &[ElementRef], selectors: &Selectors) -> Option<StockRecord> {
    if cells.len() < MIN_CELLS || cell_text(&cells[1]) == NOT_AVAILABLE {
        return None;
    }

    let link = cells[1].select(&selectors.link).next()?;
    let name = collapse_whitespace(&link.text().collect::<String>());
    let stock_code = code_from_href(link.value().attr("href")?)?;
    if name.is_empty() {
        return None;
    }

    let price = parse_int(&cell_text(&cells[2]))?;
    let (change_status, price_change_value) = parse_change_cell(&cells[3], selectors)?;
    let change_rate_text = cell_text(&cells[4]);

    Some(StockRecord {
        name,
        stock_code,
        price,
        change_status,
        price_change_value,
        change_rate_text,
        par_value: parse_int_or_zero(&cell_text(&cells[5]))?,
        market_cap: parse_int(&cell_text(&cells[6]))?,
        listed_shares: parse_int_or_zero(&cell_text(&cells[7]))?,
        foreign_ratio: parse_float_or_zero(&cell_text(&cells[8]).replace('%', ""))?,
        volume: parse_int_or_zero(&cell_text(&cells[9]))?,
        per: parse_float_or_zero(&cell_text(&cells[10]))?,
        roe: parse_float_or_zero(&cell_text(&cells[11]))?,
        scraped_at: None,
    })
}

/// 拆分“전일비”单元格，如 "상승 1,500" → (Risen, 1500)
///
/// 状态优先取 `span.blind`，没有时取文本中的标签，都没有视为보합；
/// `span.blind` 中的标签无法识别则整行丢弃
fn parse_change_cell(cell: &ElementRef, selectors: &Selectors) -> Option<(ChangeStatus, i64)> {
    let (text_status, value) = split_change_text(&cell_text(cell))?;
    let status = match cell.select(&selectors.blind).next() {
        Some(span) => ChangeStatus::from_label(&span.text().collect::<String>())?,
        None => text_status.unwrap_or(ChangeStatus::Unchanged),
    };
    Some((status, value))
}

/// 取文本最后一个空白分隔的片段作为涨跌额
pub fn split_change_text(text: &str) -> Option<(Option<ChangeStatus>, i64)> {
    let mut tokens = text.split_whitespace();
    let last = tokens.next_back()?;
    // i64::MIN 没有对应的正数，按无法解析处理
    let value = parse_int(last)?.checked_abs()?;
    let status = tokens.next().and_then(ChangeStatus::from_label);
    Some((status, value))
}

/// 链接形如 `/item/main.naver?code=005930`，代码为最后一段
pub fn code_from_href(href: &str) -> Option<String> {
    let code = match href.rsplit_once('=') {
        Some((_, code)) => code,
        None => href.trim_end_matches('/').rsplit('/').next()?,
    };
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_string())
}

/// 单元格全部文本节点，空白折叠为单个空格
fn cell_text(cell: &ElementRef) -> String {
    collapse_whitespace(&cell.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_int(s: &str) -> Option<i64> {
    s.trim().replace(',', "").parse().ok()
}

fn parse_int_or_zero(s: &str) -> Option<i64> {
    if s.trim() == NOT_AVAILABLE {
        return Some(0);
    }
    parse_int(s)
}

fn parse_float_or_zero(s: &str) -> Option<f64> {
    let s = s.trim();
    if s == NOT_AVAILABLE {
        return Some(0.0);
    }
    s.replace(',', "").parse().ok()
}
