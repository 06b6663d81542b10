//! 日历游标模块
//!
//! 日期选择器的纯逻辑部分：
//! - `CalendarDate`: `YYYY-MM-DD` 日期值，负责解析与补零格式化
//! - `CalendarCursor`: 当前显示的 (月, 年)，与输入框中保存的值相互独立
//! - `MonthGrid`: 以周一为一周起点的月视图
//! - `PickerRegistry`: 页面级单例，记录当前打开的选择器
//!
//! 不依赖 DOM，组件层只负责把这里的结果渲染出来。

use chrono::{Datelike, NaiveDate};
use std::fmt;

pub const MONTH_NAMES: [&str; 12] = [
    "Январь",
    "Февраль",
    "Март",
    "Апрель",
    "Май",
    "Июнь",
    "Июль",
    "Август",
    "Сентябрь",
    "Октябрь",
    "Ноябрь",
    "Декабрь",
];

/// 周一起始的星期表头
pub const WEEKDAY_LABELS: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

// =========================================================
// CalendarDate
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParseError(String);

impl fmt::Display for DateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid date '{}', expected YYYY-MM-DD", self.0)
    }
}

impl std::error::Error for DateParseError {}

/// 日历日期，默认值为 1970-01-01
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    /// `month` 从 1 开始
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// 解析输入框中的 `YYYY-MM-DD` 值，前后空白会被忽略
    pub fn parse(s: &str) -> Result<Self, DateParseError> {
        let trimmed = s.trim();
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| DateParseError(trimmed.to_string()))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// 0..=11
    pub fn month0(&self) -> u32 {
        self.0.month0()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year(),
            self.month0() + 1,
            self.day()
        )
    }
}

// =========================================================
// CalendarCursor
// =========================================================

/// 日期选择器上可以触发的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerAction {
    PrevMonth,
    NextMonth,
    PrevYear,
    NextYear,
    /// 选中当前游标月份中的某一天
    Select(u32),
    Clear,
    /// 点击遮罩层
    Dismiss,
}

/// 动作的结果，由组件层决定如何作用到输入框上
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    /// 游标移动，保持打开
    Navigated,
    /// 写入该值、触发 input/change 并关闭
    Commit(String),
    /// 清空输入框并关闭
    Cleared,
    /// 关闭，不修改输入框
    Dismissed,
    /// 无效动作（如不存在的日期），状态不变
    Ignored,
}

/// 当前显示的 (月, 年)
///
/// 不变量：`month` 始终位于 `0..=11`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCursor {
    month: u32,
    year: i32,
}

impl CalendarCursor {
    /// `month` 从 0 开始，越界返回 None
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (month < 12 && (MIN_YEAR..=MAX_YEAR).contains(&year)).then_some(Self { month, year })
    }

    pub fn containing(date: CalendarDate) -> Self {
        Self {
            month: date.month0(),
            year: date.year().clamp(MIN_YEAR, MAX_YEAR),
        }
    }

    /// 打开选择器时的初始游标：优先使用输入框的值，解析失败或为空时使用今天
    pub fn from_input(value: &str, today: CalendarDate) -> Self {
        match CalendarDate::parse(value) {
            Ok(date) => Self::containing(date),
            Err(_) => Self::containing(today),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// 例如 "Март 2025"
    pub fn title(&self) -> String {
        format!("{} {}", MONTH_NAMES[self.month as usize], self.year)
    }

    pub fn prev_month(&mut self) {
        if self.month == 0 {
            if self.year > MIN_YEAR {
                self.month = 11;
                self.year -= 1;
            }
        } else {
            self.month -= 1;
        }
    }

    pub fn next_month(&mut self) {
        if self.month == 11 {
            if self.year < MAX_YEAR {
                self.month = 0;
                self.year += 1;
            }
        } else {
            self.month += 1;
        }
    }

    pub fn prev_year(&mut self) {
        self.year = (self.year - 1).max(MIN_YEAR);
    }

    pub fn next_year(&mut self) {
        self.year = (self.year + 1).min(MAX_YEAR);
    }

    fn first_day(&self) -> NaiveDate {
        // month/year 受不变量约束，该日期总是存在
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1).unwrap_or_default()
    }

    pub fn days_in_month(&self) -> u32 {
        let first = self.first_day();
        let next = if self.month == 11 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 2, 1)
        };
        match next {
            Some(next) => (next - first).num_days() as u32,
            // 9999 年 12 月
            None => 31,
        }
    }

    /// 月视图开头的空白格数量：`(首日星期 - 1) mod 7`，星期日为 0
    pub fn leading_blanks(&self) -> usize {
        let weekday = self.first_day().weekday().num_days_from_sunday();
        ((weekday + 6) % 7) as usize
    }

    pub fn date_of(&self, day: u32) -> Option<CalendarDate> {
        CalendarDate::from_ymd(self.year, self.month + 1, day)
    }

    pub fn grid(&self, today: CalendarDate, selected: Option<CalendarDate>) -> MonthGrid {
        let days = (1..=self.days_in_month())
            .filter_map(|day| self.date_of(day))
            .map(|date| DayCell {
                date,
                is_today: date == today,
                is_selected: Some(date) == selected,
            })
            .collect();

        MonthGrid {
            leading_blanks: self.leading_blanks(),
            days,
        }
    }

    /// 状态机入口
    pub fn apply(&mut self, action: PickerAction) -> PickerOutcome {
        match action {
            PickerAction::PrevMonth => {
                self.prev_month();
                PickerOutcome::Navigated
            }
            PickerAction::NextMonth => {
                self.next_month();
                PickerOutcome::Navigated
            }
            PickerAction::PrevYear => {
                self.prev_year();
                PickerOutcome::Navigated
            }
            PickerAction::NextYear => {
                self.next_year();
                PickerOutcome::Navigated
            }
            PickerAction::Select(day) => match self.date_of(day) {
                Some(date) => PickerOutcome::Commit(date.to_string()),
                None => PickerOutcome::Ignored,
            },
            PickerAction::Clear => PickerOutcome::Cleared,
            PickerAction::Dismiss => PickerOutcome::Dismissed,
        }
    }
}

// =========================================================
// MonthGrid
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: CalendarDate,
    pub is_today: bool,
    pub is_selected: bool,
}

impl DayCell {
    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn class(&self) -> String {
        let mut class = String::from("dp-day");
        if self.is_today {
            class.push_str(" today");
        }
        if self.is_selected {
            class.push_str(" selected");
        }
        class
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub leading_blanks: usize,
    pub days: Vec<DayCell>,
}

// =========================================================
// PickerRegistry
// =========================================================

/// 页面上同一时间最多只有一个选择器处于打开状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PickerRegistry {
    open: Option<u64>,
}

impl PickerRegistry {
    pub fn current(&self) -> Option<u64> {
        self.open
    }

    pub fn is_open(&self, id: u64) -> bool {
        self.open == Some(id)
    }

    /// 打开 `id`，返回被顶替的选择器（如有）
    pub fn open(&mut self, id: u64) -> Option<u64> {
        self.open.replace(id).filter(|prev| *prev != id)
    }

    /// 仅当 `id` 是当前打开者时关闭，返回是否发生了变化
    pub fn close_if_owner(&mut self, id: u64) -> bool {
        if self.is_open(id) {
            self.open = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> CalendarDate {
        CalendarDate::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn formats_zero_padded() {
        assert_eq!(date(2024, 3, 5).to_string(), "2024-03-05");
        assert_eq!(date(987, 1, 1).to_string(), "0987-01-01");
    }

    #[test]
    fn parse_accepts_trimmed_iso_and_rejects_garbage() {
        assert_eq!(CalendarDate::parse(" 2024-12-31 ").unwrap(), date(2024, 12, 31));
        assert!(CalendarDate::parse("").is_err());
        assert!(CalendarDate::parse("31.12.2024").is_err());
        assert!(CalendarDate::parse("2024-02-30").is_err());
    }

    #[test]
    fn opening_uses_input_value_or_today() {
        let today = date(2025, 7, 14);

        let c = CalendarCursor::from_input("2023-01-20", today);
        assert_eq!((c.month(), c.year()), (0, 2023));

        let c = CalendarCursor::from_input("", today);
        assert_eq!((c.month(), c.year()), (6, 2025));

        let c = CalendarCursor::from_input("not a date", today);
        assert_eq!((c.month(), c.year()), (6, 2025));
    }

    #[test]
    fn month_navigation_wraps_year() {
        let mut c = CalendarCursor::new(2024, 0).unwrap();
        c.prev_month();
        assert_eq!((c.month(), c.year()), (11, 2023));
        c.next_month();
        assert_eq!((c.month(), c.year()), (0, 2024));

        let mut c = CalendarCursor::new(2024, 11).unwrap();
        c.next_month();
        assert_eq!((c.month(), c.year()), (0, 2025));
    }

    #[test]
    fn year_navigation_keeps_month() {
        let mut c = CalendarCursor::new(2024, 4).unwrap();
        c.next_year();
        assert_eq!((c.month(), c.year()), (4, 2025));
        c.prev_year();
        c.prev_year();
        assert_eq!((c.month(), c.year()), (4, 2023));
    }

    #[test]
    fn month_stays_in_range_under_long_walks() {
        let mut c = CalendarCursor::new(2000, 5).unwrap();
        for _ in 0..100 {
            c.next_month();
            assert!(c.month() < 12);
        }
        for _ in 0..250 {
            c.prev_month();
            assert!(c.month() < 12);
        }
    }

    #[test]
    fn new_rejects_out_of_range_month() {
        assert!(CalendarCursor::new(2024, 12).is_none());
        assert!(CalendarCursor::new(2024, 11).is_some());
    }

    #[test]
    fn leading_blanks_are_monday_first() {
        // 2024-01-01 是星期一
        assert_eq!(CalendarCursor::new(2024, 0).unwrap().leading_blanks(), 0);
        // 2023-10-01 是星期日
        assert_eq!(CalendarCursor::new(2023, 9).unwrap().leading_blanks(), 6);
        // 2025-05-01 是星期四
        assert_eq!(CalendarCursor::new(2025, 4).unwrap().leading_blanks(), 3);
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(CalendarCursor::new(2024, 1).unwrap().days_in_month(), 29);
        assert_eq!(CalendarCursor::new(2023, 1).unwrap().days_in_month(), 28);
        assert_eq!(CalendarCursor::new(2023, 11).unwrap().days_in_month(), 31);
        assert_eq!(CalendarCursor::new(2023, 3).unwrap().days_in_month(), 30);
    }

    #[test]
    fn grid_tags_today_and_selected() {
        let today = date(2025, 3, 10);
        let selected = date(2025, 3, 21);
        let grid = CalendarCursor::containing(today).grid(today, Some(selected));

        assert_eq!(grid.days.len(), 31);
        // 2025-03-01 是星期六
        assert_eq!(grid.leading_blanks, 5);

        let tagged: Vec<_> = grid
            .days
            .iter()
            .filter(|d| d.is_today || d.is_selected)
            .map(|d| (d.day(), d.class()))
            .collect();
        assert_eq!(
            tagged,
            vec![
                (10, "dp-day today".to_string()),
                (21, "dp-day selected".to_string())
            ]
        );
    }

    #[test]
    fn grid_of_other_month_has_no_today() {
        let today = date(2025, 3, 10);
        let grid = CalendarCursor::new(2025, 3).unwrap().grid(today, None);
        assert!(grid.days.iter().all(|d| !d.is_today && !d.is_selected));
    }

    #[test]
    fn select_commits_padded_value() {
        let mut c = CalendarCursor::new(2025, 0).unwrap();
        assert_eq!(
            c.apply(PickerAction::Select(7)),
            PickerOutcome::Commit("2025-01-07".into())
        );
        assert_eq!(c.apply(PickerAction::Select(32)), PickerOutcome::Ignored);
        assert_eq!(c.apply(PickerAction::Clear), PickerOutcome::Cleared);
        assert_eq!(c.apply(PickerAction::Dismiss), PickerOutcome::Dismissed);
        assert_eq!(c.apply(PickerAction::PrevMonth), PickerOutcome::Navigated);
        assert_eq!((c.month(), c.year()), (11, 2024));
    }

    #[test]
    fn title_is_russian() {
        assert_eq!(CalendarCursor::new(2025, 2).unwrap().title(), "Март 2025");
    }

    #[test]
    fn opening_second_picker_replaces_first() {
        let mut registry = PickerRegistry::default();
        assert_eq!(registry.open(1), None);
        assert!(registry.is_open(1));

        assert_eq!(registry.open(2), Some(1));
        assert!(!registry.is_open(1));
        assert!(registry.is_open(2));

        // 重复打开自身不算顶替
        assert_eq!(registry.open(2), None);
    }

    #[test]
    fn stale_close_does_not_affect_new_owner() {
        let mut registry = PickerRegistry::default();
        registry.open(1);
        registry.open(2);

        // 1 的遮罩点击或卸载清理来得较晚
        assert!(!registry.close_if_owner(1));
        assert_eq!(registry.current(), Some(2));

        assert!(registry.close_if_owner(2));
        assert_eq!(registry.current(), None);
        assert!(!registry.close_if_owner(2));
    }
}
