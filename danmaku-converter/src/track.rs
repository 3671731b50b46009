//! Lane allocation and collision avoidance
//!
//! The usable screen height is cut into lanes of `2 * MARGIN + text height`
//! pixels. Scrolling comments occupy horizontal lanes and stationary (top and
//! bottom) comments share a vertical track. Every placed comment leaves a
//! [`TrackItem`] behind; a later comment takes the first lane, in scan order,
//! that none of the recorded items rejects. When every lane is taken the
//! comment is parked off screen and nothing is recorded.
//!
//! Items are only ever compared against later comments, so comments must be
//! allocated in ascending start time.

use crate::metrics::TextSize;
use danmaku_core::comment::Motion;
use danmaku_core::{Comment, Resolution, OFF_SCREEN_TAG};
use std::fmt;
use tracing::debug;

/// Vertical padding above and below the text of each lane, in pixels
pub const MARGIN: f64 = 4.0;

/// Minimum gap in seconds between two scrolling comments entering one lane
pub const NEXT_DANMAKU_DELAY: f64 = 0.05;

/// Lane layout derived from the screen size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneGeometry {
    pub screen_width: f64,
    pub screen_height: f64,
    pub lane_height: f64,
    pub lane_count: usize,
}

impl LaneGeometry {
    /// Lays out lanes for `comment_height` pixel text, leaving `bottom_margin`
    /// (a fraction of the height) free at the bottom
    pub fn new(resolution: Resolution, bottom_margin: f64, comment_height: f64) -> Self {
        let screen_height = resolution.height as f64;
        let lane_height = MARGIN * 2.0 + comment_height;
        let usable = screen_height * (1.0 - bottom_margin.clamp(0.0, 1.0));
        let lane_count = if lane_height > 0.0 {
            (usable / lane_height).floor().max(0.0) as usize
        } else {
            0
        };
        Self {
            screen_width: resolution.width as f64,
            screen_height,
            lane_height,
            lane_count,
        }
    }

    /// Y coordinate of the text center of a lane counted from the top
    fn top_anchored_y(&self, lane: usize, half_height: f64) -> f64 {
        lane as f64 * self.lane_height + MARGIN + half_height
    }

    /// Y coordinate of the text center of a lane stacked from the bottom edge
    fn bottom_anchored_y(&self, lane: usize, half_height: f64) -> f64 {
        let from_bottom = self.lane_count.saturating_sub(1).saturating_sub(lane);
        self.screen_height - MARGIN - half_height - from_bottom as f64 * self.lane_height
    }
}

/// Timing and size of the comment being placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub start_time: f64,
    pub duration: f64,
    pub size: TextSize,
}

/// Reserved occupancy of one lane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackItem {
    pub start_time: f64,
    pub end_time: f64,
    pub lane: usize,
}

/// Occupancy of a scrolling comment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalTrackItem {
    pub item: TrackItem,
    /// Rendered width in pixels
    pub width: f64,
    /// Time at which the trailing edge has entered the screen, plus the delay
    pub fully_visible_at: f64,
}

/// Something recorded on a track
pub trait Occupant {
    fn lane(&self) -> usize;

    /// Latest instant at which this item can still reject a comment
    fn expires_at(&self) -> f64;
}

impl Occupant for TrackItem {
    fn lane(&self) -> usize {
        self.lane
    }

    fn expires_at(&self) -> f64 {
        self.end_time
    }
}

impl Occupant for HorizontalTrackItem {
    fn lane(&self) -> usize {
        self.item.lane
    }

    fn expires_at(&self) -> f64 {
        self.item.end_time.max(self.fully_visible_at)
    }
}

/// Per-axis behavior plugged into the shared lane search
pub trait LaneStrategy {
    type Item: Occupant;

    /// First lane to test
    fn initial_lane(&self, lane_count: usize) -> usize;

    /// Lane increment between attempts, +1 or -1
    fn step(&self) -> isize;

    /// Whether `item` forbids placing the comment on `lane`
    fn collides(&self, item: &Self::Item, lane: usize, placement: &Placement) -> bool;

    fn build_item(&self, lane: usize, placement: &Placement) -> Self::Item;

    fn render_directive(
        &self,
        lane: usize,
        placement: &Placement,
        geometry: &LaneGeometry,
    ) -> Directive;
}

/// Scrolling comments, scanned from the top lane down
#[derive(Debug, Clone, Copy)]
pub struct HorizontalStrategy {
    screen_width: f64,
}

impl HorizontalStrategy {
    pub fn new(screen_width: f64) -> Self {
        Self { screen_width }
    }

    /// Seconds until a comment of `width` pixels is entirely on screen.
    ///
    /// The comment travels `screen_width + width` pixels in `duration`
    /// seconds, so its trailing edge enters after `width / speed`.
    pub fn visible_time(&self, width: f64, duration: f64) -> f64 {
        NEXT_DANMAKU_DELAY + duration * width / (self.screen_width + width)
    }

    /// Seconds until the leading edge of a comment reaches the left edge
    pub fn left_edge_time(&self, width: f64, duration: f64) -> f64 {
        duration * self.screen_width / (self.screen_width + width)
    }
}

impl LaneStrategy for HorizontalStrategy {
    type Item = HorizontalTrackItem;

    fn initial_lane(&self, _lane_count: usize) -> usize {
        0
    }

    fn step(&self) -> isize {
        1
    }

    fn collides(&self, it: &HorizontalTrackItem, lane: usize, placement: &Placement) -> bool {
        if it.item.lane != lane {
            return false;
        }
        let width = placement.size.width;
        if it.width < width {
            // The faster comment must not catch up with the occupant before it leaves
            placement.start_time + self.left_edge_time(width, placement.duration)
                <= it.item.end_time
        } else {
            // Same or slower: only wait for the occupant to clear the right edge
            it.fully_visible_at > placement.start_time
        }
    }

    fn build_item(&self, lane: usize, placement: &Placement) -> HorizontalTrackItem {
        let width = placement.size.width;
        HorizontalTrackItem {
            item: TrackItem {
                start_time: placement.start_time,
                end_time: placement.start_time + placement.duration,
                lane,
            },
            width,
            fully_visible_at: placement.start_time + self.visible_time(width, placement.duration),
        }
    }

    fn render_directive(
        &self,
        lane: usize,
        placement: &Placement,
        geometry: &LaneGeometry,
    ) -> Directive {
        let half_width = placement.size.half_width();
        let y = geometry.top_anchored_y(lane, placement.size.half_height());
        Directive::Move {
            from: (geometry.screen_width + half_width, y),
            to: (-half_width, y),
            duration_ms: placement.duration * 1000.0,
        }
    }
}

/// Which edge stationary comments stack from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Bottom,
}

/// Stationary comments; top ones scan downwards, bottom ones upwards
#[derive(Debug, Clone, Copy)]
pub struct VerticalStrategy {
    anchor: Anchor,
}

impl VerticalStrategy {
    pub fn new(anchor: Anchor) -> Self {
        Self { anchor }
    }
}

impl LaneStrategy for VerticalStrategy {
    type Item = TrackItem;

    fn initial_lane(&self, lane_count: usize) -> usize {
        match self.anchor {
            Anchor::Top => 0,
            Anchor::Bottom => lane_count.saturating_sub(1),
        }
    }

    fn step(&self) -> isize {
        match self.anchor {
            Anchor::Top => 1,
            Anchor::Bottom => -1,
        }
    }

    fn collides(&self, it: &TrackItem, lane: usize, placement: &Placement) -> bool {
        it.lane == lane && it.end_time > placement.start_time
    }

    fn build_item(&self, lane: usize, placement: &Placement) -> TrackItem {
        TrackItem {
            start_time: placement.start_time,
            end_time: placement.start_time + placement.duration,
            lane,
        }
    }

    fn render_directive(
        &self,
        lane: usize,
        placement: &Placement,
        geometry: &LaneGeometry,
    ) -> Directive {
        let half_height = placement.size.half_height();
        let y = match self.anchor {
            Anchor::Top => geometry.top_anchored_y(lane, half_height),
            Anchor::Bottom => geometry.bottom_anchored_y(lane, half_height),
        };
        Directive::Pos {
            x: geometry.screen_width / 2.0,
            y,
        }
    }
}

/// Positioning instruction for one comment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Directive {
    /// Slide from `from` to `to` over `duration_ms`
    Move {
        from: (f64, f64),
        to: (f64, f64),
        duration_ms: f64,
    },
    /// Fixed position of the text center
    Pos { x: f64, y: f64 },
    /// Parked outside the visible area
    OffScreen,
}

impl Directive {
    pub fn is_off_screen(&self) -> bool {
        matches!(self, Directive::OffScreen)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Move {
                from,
                to,
                duration_ms,
            } => write!(
                f,
                "\\move({},{},{},{},0,{})",
                Num(from.0),
                Num(from.1),
                Num(to.0),
                Num(to.1),
                Num(*duration_ms)
            ),
            Directive::Pos { x, y } => write!(f, "\\pos({},{})", Num(*x), Num(*y)),
            Directive::OffScreen => f.write_str(OFF_SCREEN_TAG),
        }
    }
}

/// Shortest round-trip decimal, without a sign on zero
struct Num(f64);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0.0 {
            f.write_str("0")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Track a comment was recorded on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Outcome of placing one comment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub directive: Directive,
    /// Lane and track the comment occupies, `None` when parked off screen
    pub slot: Option<(Axis, usize)>,
}

impl Allocation {
    fn off_screen() -> Self {
        Self {
            directive: Directive::OffScreen,
            slot: None,
        }
    }

    pub fn lane(&self) -> Option<usize> {
        self.slot.map(|(_, lane)| lane)
    }
}

/// Places comments on lanes for one conversion run
#[derive(Debug, Clone)]
pub struct TrackAllocator {
    geometry: LaneGeometry,
    horizontal: Vec<HorizontalTrackItem>,
    vertical: Vec<TrackItem>,
}

impl TrackAllocator {
    /// Creates an allocator with empty tracks
    pub fn new(resolution: Resolution, bottom_margin: f64, comment_height: f64) -> Self {
        Self::with_geometry(LaneGeometry::new(resolution, bottom_margin, comment_height))
    }

    pub fn with_geometry(geometry: LaneGeometry) -> Self {
        Self {
            geometry,
            horizontal: Vec::new(),
            vertical: Vec::new(),
        }
    }

    pub fn geometry(&self) -> &LaneGeometry {
        &self.geometry
    }

    /// Places a comment that stays on screen for `duration` seconds and
    /// renders at `size`. Comments must arrive in ascending start time.
    ///
    /// Negative or NaN durations are treated as zero.
    pub fn allocate(&mut self, comment: &Comment, duration: f64, size: TextSize) -> Allocation {
        let placement = Placement {
            start_time: comment.start_time,
            duration: duration.max(0.0),
            size,
        };

        let (axis, found) = match comment.danmaku_type.motion() {
            Motion::Scrolling => {
                let strategy = HorizontalStrategy::new(self.geometry.screen_width);
                let found = search(&strategy, &mut self.horizontal, &self.geometry, &placement);
                (Axis::Horizontal, found)
            }
            motion @ (Motion::Top | Motion::Bottom) => {
                let anchor = if motion == Motion::Top {
                    Anchor::Top
                } else {
                    Anchor::Bottom
                };
                let strategy = VerticalStrategy::new(anchor);
                let found = search(&strategy, &mut self.vertical, &self.geometry, &placement);
                (Axis::Vertical, found)
            }
            Motion::Unsupported => return Allocation::off_screen(),
        };

        match found {
            Some((lane, directive)) => {
                debug!(start = comment.start_time, ?axis, lane, "placed comment");
                Allocation {
                    directive,
                    slot: Some((axis, lane)),
                }
            }
            None => {
                debug!(
                    start = comment.start_time,
                    ?axis,
                    lanes = self.geometry.lane_count,
                    "no free lane, placing comment off screen"
                );
                Allocation::off_screen()
            }
        }
    }

    /// Drops items that cannot reject any comment starting at or after `time`
    pub fn trim_before(&mut self, time: f64) {
        self.horizontal.retain(|it| it.expires_at() >= time);
        self.vertical.retain(|it| it.expires_at() >= time);
    }

    pub fn horizontal_items(&self) -> &[HorizontalTrackItem] {
        &self.horizontal
    }

    pub fn vertical_items(&self) -> &[TrackItem] {
        &self.vertical
    }
}

/// Scans lanes from the strategy's initial lane until one is free
fn search<S: LaneStrategy>(
    strategy: &S,
    track: &mut Vec<S::Item>,
    geometry: &LaneGeometry,
    placement: &Placement,
) -> Option<(usize, Directive)> {
    if geometry.lane_count == 0 {
        return None;
    }

    let mut lane = strategy.initial_lane(geometry.lane_count) as isize;
    while lane >= 0 && (lane as usize) < geometry.lane_count {
        let candidate = lane as usize;
        if !track
            .iter()
            .any(|it| strategy.collides(it, candidate, placement))
        {
            track.push(strategy.build_item(candidate, placement));
            return Some((
                candidate,
                strategy.render_directive(candidate, placement, geometry),
            ));
        }
        lane += strategy.step();
    }
    None
}
