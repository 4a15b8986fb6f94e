//! HTML rendering of route data.
//!
//! Pure functions from loader data to markup; no store access happens here.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    forms::DELETE_NOTE_INTENT,
    models::{NoteLoaderData, NoteSummary, User},
};

const SITE_NAME: &str = "Epic Notes";
const DESCRIPTION_LIMIT: usize = 100;

/// Escapes text for use in element content and quoted attribute values.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Where a note image is served from.
pub fn note_image_src(image_id: Uuid) -> String {
    format!("/resources/note-images/{}", image_id)
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// time_ago
///
/// Human distance between `then` and `now`, worded like date-fns'
/// `formatDistanceToNow`: "less than a minute", "5 minutes", "about 2 hours",
/// "3 days", "about 1 month", "over 1 year", ...
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const MINUTES_IN_DAY: i64 = 1440;
    const MINUTES_IN_MONTH: i64 = 43200;
    const MINUTES_IN_TWO_MONTHS: i64 = 86400;

    let seconds = (now - then).num_seconds().abs();
    let minutes = (seconds as f64 / 60.0).round() as i64;

    if minutes < 2 {
        return if minutes == 0 {
            "less than a minute".to_string()
        } else {
            plural(minutes, "minute")
        };
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        let hours = (minutes as f64 / 60.0).round() as i64;
        return format!("about {}", plural(hours, "hour"));
    }
    if minutes < 2520 {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        let days = (minutes as f64 / MINUTES_IN_DAY as f64).round() as i64;
        return plural(days, "day");
    }
    if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        return format!("about {}", plural(months, "month"));
    }

    let months = minutes / MINUTES_IN_MONTH;
    if months < 12 {
        let nearest = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        return plural(nearest, "month");
    }

    let months_since_start_of_year = months % 12;
    let years = months / 12;
    if months_since_start_of_year < 3 {
        format!("about {}", plural(years, "year"))
    } else if months_since_start_of_year < 9 {
        format!("over {}", plural(years, "year"))
    } else {
        format!("almost {}", plural(years + 1, "year"))
    }
}

/// Content shortened for `<meta name="description">`.
pub fn summarize(content: &str) -> String {
    if content.chars().count() <= DESCRIPTION_LIMIT {
        return content.to_string();
    }
    // The ellipsis counts toward the limit.
    let cut: String = content.chars().take(DESCRIPTION_LIMIT - 3).collect();
    format!("{}...", cut)
}

fn layout(title: &str, description: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<meta name="description" content="{description}">
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape(title),
        description = escape(description),
        body = body,
    )
}

/// render_note_page
///
/// Title, content, linked thumbnails and the "updated X ago" label. The floating
/// toolbar shows up for owners and for anyone allowed to delete; the delete form
/// only when `can_delete` holds.
pub fn render_note_page(username: &str, data: &NoteLoaderData) -> String {
    let note = &data.note;

    let images: String = note
        .images
        .iter()
        .map(|image| {
            let src = note_image_src(image.id);
            let alt = image.alt_text.as_deref().unwrap_or_default();
            format!(
                r#"<li><a href="{src}"><img class="thumbnail" src="{src}" alt="{alt}"></a></li>"#,
                src = src,
                alt = escape(alt),
            )
        })
        .collect();

    let delete_form = if data.can_delete {
        format!(
            r#"<form method="POST" class="delete-note"><input type="hidden" name="noteId" value="{id}"><button type="submit" name="intent" value="{intent}">Delete</button></form>"#,
            id = note.id,
            intent = DELETE_NOTE_INTENT,
        )
    } else {
        String::new()
    };

    let toolbar = if data.can_delete || data.is_owner {
        format!(
            r#"<div class="floating-toolbar">{delete_form}<a class="edit-note" href="/users/{user}/notes/{id}/edit">Edit</a></div>"#,
            delete_form = delete_form,
            user = escape(username),
            id = note.id,
        )
    } else {
        String::new()
    };

    let body = format!(
        r#"<main class="note">
<h2>{title}</h2>
<ul class="note-images">{images}</ul>
<p class="note-content">{content}</p>
<span class="time-ago">{time_ago} ago</span>
{toolbar}
</main>"#,
        title = escape(&note.title),
        images = images,
        content = escape(&note.content),
        time_ago = escape(&data.time_ago),
        toolbar = toolbar,
    );

    let title = format!("{} | {}'s Notes | {}", note.title, username, SITE_NAME);
    layout(&title, &summarize(&note.content), &body)
}

/// Listing of an owner's notes, each linking to its page.
pub fn render_notes_list(owner: &User, notes: &[NoteSummary]) -> String {
    let display_name = owner.name.as_deref().unwrap_or(&owner.username);
    let items: String = notes
        .iter()
        .map(|note| {
            format!(
                r#"<li><a href="/users/{user}/notes/{id}">{title}</a></li>"#,
                user = escape(&owner.username),
                id = note.id,
                title = escape(&note.title),
            )
        })
        .collect();

    let body = format!(
        r#"<main class="notes">
<h1>{name}'s Notes</h1>
<ul class="note-list">{items}</ul>
</main>"#,
        name = escape(display_name),
        items = items,
    );

    let title = format!("{}'s Notes | {}", display_name, SITE_NAME);
    let description = format!("Checkout {}'s Notes on {}", display_name, SITE_NAME);
    layout(&title, &description, &body)
}

/// Error boundary page keyed by status.
pub fn render_error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        r#"<main class="error">
<h1>{code}</h1>
<p>{message}</p>
</main>"#,
        code = status.as_u16(),
        message = escape(message),
    );
    let title = format!("{} | {}", status.canonical_reason().unwrap_or("Error"), SITE_NAME);
    layout(&title, message, &body)
}
