//! 表格搜索匹配

/// 规范化搜索词：去除首尾空白并转为小写（支持西里尔字母）
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// 任一单元格包含搜索词即匹配；空搜索词匹配所有行
///
/// `query` 需先经过 [`normalize_query`]。
pub fn row_matches<'a, I>(cells: I, query: &str) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    if query.is_empty() {
        return true;
    }
    cells
        .into_iter()
        .any(|cell| cell.to_lowercase().contains(query))
}

/// 返回匹配行的下标
pub fn filter_rows<'a, R, F, I>(rows: &'a [R], query: &str, cells: F) -> Vec<usize>
where
    F: Fn(&'a R) -> I,
    I: IntoIterator<Item = &'a str>,
{
    let query = normalize_query(query);
    rows.iter()
        .enumerate()
        .filter(|&(_, row)| row_matches(cells(row), &query))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_matches_everything() {
        assert!(row_matches(["a", "b"], ""));
        assert!(row_matches(Vec::<&str>::new(), ""));
    }

    #[test]
    fn cyrillic_is_case_insensitive() {
        let q = normalize_query("  ИВАНОВ ");
        assert!(row_matches(["Иванов Иван", "Lada"], &q));
        assert!(!row_matches(["Петров", "Lada"], &q));
    }

    #[test]
    fn filter_rows_returns_indices() {
        let rows: Vec<[String; 2]> = [["Ford", "А123ВС"], ["Lada", "Х777ХХ"], ["Ford Focus", ""]]
            .into_iter()
            .map(|r| r.map(String::from))
            .collect();
        let hits = filter_rows(&rows, "ford", |r| r.iter().map(String::as_str));
        assert_eq!(hits, vec![0, 2]);
    }
}
