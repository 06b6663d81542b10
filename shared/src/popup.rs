//! 弹出层定位
//!
//! 计算日期选择器相对于输入框的位置。输入均为视口坐标（即
//! `getBoundingClientRect` 的结果），输出为加上滚动偏移后的文档坐标。

/// 弹层与输入框之间的固定间距
pub const POPUP_OFFSET: f64 = 4.0;
/// 弹层距视口左边缘的最小距离
pub const MIN_MARGIN: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub top: f64,
    pub left: f64,
    /// 是否翻转到输入框上方
    pub above: bool,
}

/// 计算弹层位置
///
/// 1. 默认放在输入框下方 `POPUP_OFFSET` 处
/// 2. 超出视口底部则翻到上方
/// 3. 超出右边缘则向左收
/// 4. 最终 left 不小于 `MIN_MARGIN`
pub fn place(anchor: Rect, popup_width: f64, popup_height: f64, viewport: Viewport) -> Placement {
    let below = anchor.bottom() + POPUP_OFFSET;
    let above = below + popup_height > viewport.height;
    let top = if above {
        anchor.top - popup_height - POPUP_OFFSET
    } else {
        below
    };

    let mut left = anchor.left;
    if left + popup_width > viewport.width {
        left = viewport.width - popup_width - MIN_MARGIN;
    }
    let left = left.max(MIN_MARGIN);

    Placement {
        top: top + viewport.scroll_y,
        left: left + viewport.scroll_x,
        above,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport {
            width: 1000.0,
            height: 800.0,
            ..Default::default()
        }
    }

    fn input_at(top: f64, left: f64) -> Rect {
        Rect {
            top,
            left,
            width: 200.0,
            height: 30.0,
        }
    }

    #[test]
    fn sits_below_input_by_offset() {
        let p = place(input_at(100.0, 50.0), 280.0, 300.0, viewport());
        assert_eq!(p.top, 134.0);
        assert_eq!(p.left, 50.0);
        assert!(!p.above);
    }

    #[test]
    fn flips_above_when_bottom_overflows() {
        let p = place(input_at(600.0, 50.0), 280.0, 300.0, viewport());
        assert!(p.above);
        assert_eq!(p.top, 600.0 - 300.0 - POPUP_OFFSET);
    }

    #[test]
    fn clamps_left_when_right_edge_overflows() {
        let p = place(input_at(100.0, 900.0), 280.0, 300.0, viewport());
        assert_eq!(p.left, 1000.0 - 280.0 - MIN_MARGIN);
    }

    #[test]
    fn never_left_of_minimum_margin() {
        let p = place(input_at(100.0, 2.0), 280.0, 300.0, viewport());
        assert_eq!(p.left, MIN_MARGIN);

        // 视口比弹层还窄
        let narrow = Viewport {
            width: 200.0,
            height: 800.0,
            ..Default::default()
        };
        let p = place(input_at(100.0, 20.0), 280.0, 300.0, narrow);
        assert_eq!(p.left, MIN_MARGIN);
    }

    #[test]
    fn adds_scroll_offsets() {
        let vp = Viewport {
            scroll_x: 10.0,
            scroll_y: 500.0,
            ..viewport()
        };
        let p = place(input_at(100.0, 50.0), 280.0, 300.0, vp);
        assert_eq!(p.top, 634.0);
        assert_eq!(p.left, 60.0);
    }
}
