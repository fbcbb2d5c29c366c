//! Display formatting for project pages.
//!
//! Pure functions over a [`ProjectView`] read model and its [`RewardView`]s.
//! Nothing here touches storage; the API layer builds the views from rows
//! and serialises a [`ProjectPresentation`] next to the raw project.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::project_state::ProjectState;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Query string appended to every embedded player URL.
pub const EMBED_PARAMS: &str =
    "title=0&byline=0&portrait=0&autoplay=0&color=ffffff&badge=0&modestbranding=1&showinfo=0&border=0&controls=2";

/// Image shown while a video thumbnail is still being fetched.
pub const PLACEHOLDER_UPLOAD_IN_PROGRESS: &str = "image-placeholder-upload-in-progress.jpg";

/// Image shown when the project has neither an image nor a video.
pub const PLACEHOLDER_IMAGE: &str = "image-placeholder.jpg";

/// Shown in place of a yield range when no reward carries one.
pub const YIELD_TBD: &str = "TBD";

/// Date format for the campaign end date.
const EXPIRES_AT_FORMAT: &str = "%m/%d/%Y";

static VIMEO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?:)?//(?:www\.|player\.)?vimeo\.com/(?:video/)?(\d+)").expect("valid regex")
});

static YOUTUBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?:)?//(?:(?:www\.|m\.)?youtube\.com/(?:watch\?(?:.*&)?v=|embed/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .expect("valid regex")
});

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]\n]+)\]\((https?://[^\s)]+)\)|(https?://(?:[^\s<&\[\]()]|&amp;)+)")
        .expect("valid regex")
});

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// The presentation-relevant fields of a project.
#[derive(Debug, Clone, Default)]
pub struct ProjectView {
    pub state: Option<ProjectState>,
    pub reached_goal: bool,
    pub online_date: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub location: Option<String>,
    pub address_neighborhood: Option<String>,
    pub summary: Option<String>,
    pub video_url: Option<String>,
    pub video_thumbnail_url: Option<String>,
    pub uploaded_image_url: Option<String>,
    pub organization_type: Option<String>,
}

/// The presentation-relevant fields of a reward.
#[derive(Debug, Clone, Default)]
pub struct RewardView {
    /// Annual yield as a percentage, e.g. `2.24`.
    pub yield_rate: Option<Decimal>,
    /// Maturity date.
    pub happens_at: Option<NaiveDate>,
}

/// Remaining time expressed in its largest whole unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeToGo {
    pub time: i64,
    pub unit: String,
}

/// Everything the project page renders besides the raw row.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectPresentation {
    pub status: String,
    pub time_to_go: Option<TimeToGo>,
    pub expires_at: String,
    pub address: String,
    pub video_embed_url: Option<String>,
    pub image: String,
    pub organization_type: String,
    pub summary_html: String,
    pub maturity_period: String,
    pub yield_range: String,
}

impl ProjectPresentation {
    pub fn build(project: &ProjectView, rewards: &[RewardView], now: Timestamp) -> Self {
        Self {
            status: display_status(project.state, project.reached_goal),
            time_to_go: project.expires_at.map(|at| time_to_go(at, now)),
            expires_at: display_expires_at(project.online_date, project.expires_at),
            address: display_address_formatted(
                project.location.as_deref(),
                project.address_neighborhood.as_deref(),
            ),
            video_embed_url: project
                .video_url
                .as_deref()
                .and_then(display_video_embed_url),
            image: display_image(project).to_string(),
            organization_type: project
                .organization_type
                .as_deref()
                .map(display_organization_type)
                .unwrap_or_default(),
            summary_html: summary_html(project.summary.as_deref().unwrap_or_default()),
            maturity_period: maturity_period(rewards),
            yield_range: display_yield(rewards),
        }
    }
}

/// The compact card shown on embeddable project widgets.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectCard {
    pub status: String,
    pub time_to_go: Option<TimeToGo>,
    pub expires_at: String,
    pub address: String,
    pub image: String,
}

impl ProjectCard {
    pub fn build(project: &ProjectView, now: Timestamp) -> Self {
        Self {
            status: display_status(project.state, project.reached_goal),
            time_to_go: project.expires_at.map(|at| time_to_go(at, now)),
            expires_at: display_expires_at(project.online_date, project.expires_at),
            address: display_address_formatted(
                project.location.as_deref(),
                project.address_neighborhood.as_deref(),
            ),
            image: display_image(project).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting functions
// ---------------------------------------------------------------------------

/// Status label: online projects report goal progress, others their state.
pub fn display_status(state: Option<ProjectState>, reached_goal: bool) -> String {
    match state {
        Some(ProjectState::Online) if reached_goal => "reached_goal".to_string(),
        Some(ProjectState::Online) => "not_reached_goal".to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Time left until `expires_at` in the largest unit with at least one whole
/// unit remaining, rounded to the nearest unit.
pub fn time_to_go(expires_at: Timestamp, now: Timestamp) -> TimeToGo {
    const UNITS: [(&str, i64); 4] = [("day", 86_400), ("hour", 3_600), ("minute", 60), ("second", 1)];

    let remaining = (expires_at - now).num_seconds();

    for (unit, seconds) in UNITS {
        if remaining >= seconds {
            let time = (remaining + seconds / 2) / seconds;
            return TimeToGo {
                time,
                unit: pluralize(time, unit),
            };
        }
    }

    TimeToGo {
        time: 0,
        unit: pluralize(0, "second"),
    }
}

fn pluralize(count: i64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}

/// Campaign end date, or an empty string when the project is unscheduled.
pub fn display_expires_at(online_date: Option<Timestamp>, expires_at: Option<Timestamp>) -> String {
    match (online_date, expires_at) {
        (Some(_), Some(at)) => at.date_naive().format(EXPIRES_AT_FORMAT).to_string(),
        _ => String::new(),
    }
}

/// `"<neighborhood> // <city>, <state>"` with blank parts dropped.
///
/// `location` is free text of the form `"City, ST"`; either side may be
/// missing.
pub fn display_address_formatted(location: Option<&str>, neighborhood: Option<&str>) -> String {
    let city_state = location
        .map(|loc| {
            let (city, state) = loc.split_once(',').unwrap_or((loc, ""));
            [city.trim(), state.trim()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    match neighborhood.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) if !city_state.is_empty() => format!("{n} // {city_state}"),
        Some(n) => n.to_string(),
        None => city_state,
    }
}

/// Protocol-relative player URL for a Vimeo or YouTube video.
pub fn display_video_embed_url(video_url: &str) -> Option<String> {
    let url = video_url.trim();
    if url.is_empty() {
        return None;
    }

    if let Some(caps) = VIMEO_RE.captures(url) {
        return Some(format!("//player.vimeo.com/video/{}?{EMBED_PARAMS}", &caps[1]));
    }
    if let Some(caps) = YOUTUBE_RE.captures(url) {
        return Some(format!("//www.youtube.com/embed/{}?{EMBED_PARAMS}", &caps[1]));
    }
    None
}

/// Image to show on project cards.
pub fn display_image(project: &ProjectView) -> &str {
    let present = |v: &Option<String>| v.as_deref().filter(|s| !s.trim().is_empty()).is_some();

    if let Some(url) = project.uploaded_image_url.as_deref().filter(|s| !s.trim().is_empty()) {
        url
    } else if let Some(url) = project.video_thumbnail_url.as_deref().filter(|s| !s.trim().is_empty()) {
        url
    } else if present(&project.video_url) {
        PLACEHOLDER_UPLOAD_IN_PROGRESS
    } else {
        PLACEHOLDER_IMAGE
    }
}

/// `"school_district"` -> `"School District"`.
pub fn display_organization_type(token: &str) -> String {
    token
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a plain-text summary as HTML.
///
/// Markup in the input is escaped. `[text](url)` links and bare http(s) URLs
/// become anchors; blank-line separated blocks become paragraphs.
pub fn summary_html(summary: &str) -> String {
    let normalized = summary.replace("\r\n", "\n");
    let mut html = String::new();

    for block in normalized.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        html.push_str("<p>");
        html.push_str(&linkify(&escape_html(block)));
        html.push_str("</p>\n");
    }

    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

fn linkify(escaped: &str) -> String {
    LINK_RE
        .replace_all(escaped, |caps: &regex::Captures<'_>| {
            match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(text), Some(href), _) => {
                    format!("<a href=\"{}\">{}</a>", href.as_str(), text.as_str())
                }
                (_, _, Some(url)) => format!("<a href=\"{0}\">{0}</a>", url.as_str()),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Maturity years spanned by the rewards: `""`, `"2090"` or `"2060-2090"`.
pub fn maturity_period(rewards: &[RewardView]) -> String {
    let years = rewards.iter().filter_map(|r| r.happens_at.map(|d| d.year()));
    match min_max(years) {
        None => String::new(),
        Some((min, max)) if min == max => min.to_string(),
        Some((min, max)) => format!("{min}-{max}"),
    }
}

/// Yield range across the rewards: `"TBD"`, `"2.24%"` or `"2.24% - 3%"`.
pub fn display_yield(rewards: &[RewardView]) -> String {
    let yields = rewards.iter().filter_map(|r| r.yield_rate.map(|y| y.normalize()));
    match min_max(yields) {
        None => YIELD_TBD.to_string(),
        Some((min, max)) if min == max => format!("{min}%"),
        Some((min, max)) => format!("{min}% - {max}%"),
    }
}

fn min_max<T: PartialOrd + Copy>(values: impl Iterator<Item = T>) -> Option<(T, T)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((
            if v < lo { v } else { lo },
            if v > hi { v } else { hi },
        )),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
