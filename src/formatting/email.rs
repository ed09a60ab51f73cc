//! HTML email rendering.

use super::{appearance, SOURCE};
use crate::config::EmailConfig;
use crate::core::{EmailContent, Notification};

/// Renders the subject line and a self-contained HTML document.
pub fn render(notification: &Notification, config: &EmailConfig) -> EmailContent {
    EmailContent {
        from: config.from.clone(),
        to: config.to.clone(),
        subject: subject(notification),
        html: html(notification),
    }
}

/// `[SEVERITY] title`
pub fn subject(notification: &Notification) -> String {
    format!(
        "[{}] {}",
        notification.severity.label(),
        notification.message.title()
    )
}

pub fn html(notification: &Notification) -> String {
    let look = appearance(&notification.severity);
    let title = escape(notification.message.title());
    let body = escape(notification.message.body()).replace('\n', "<br>");
    let severity = escape(&notification.severity.label());
    let timestamp = notification.iso_timestamp();

    let details: String = notification
        .metadata
        .context_fields()
        .into_iter()
        .map(|(label, value)| {
            format!(
                "        <tr><td class=\"label\">{}</td><td>{}</td></tr>\n",
                label,
                escape(value)
            )
        })
        .collect();
    let details_block = if details.is_empty() {
        String::new()
    } else {
        format!("      <table class=\"details\">\n{details}      </table>\n")
    };

    let runbook = notification
        .metadata
        .runbook_url()
        .map(|url| {
            format!(
                "      <p><a href=\"{}\">View Runbook</a></p>\n",
                escape(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
      body {{ font-family: Arial, sans-serif; margin: 0; padding: 0; background: #f4f4f4; }}
      .container {{ max-width: 600px; margin: 20px auto; background: #ffffff; }}
      .header {{ background: {color}; color: #ffffff; padding: 20px; }}
      .content {{ padding: 20px; color: #333333; }}
      .details td {{ padding: 4px 8px; }}
      .label {{ font-weight: bold; }}
      .footer {{ padding: 12px 20px; font-size: 12px; color: #777777; border-top: 1px solid #eeeeee; }}
    </style>
  </head>
  <body>
    <div class="container">
      <div class="header">
        <h2>{emoji} {title}</h2>
        <p>Severity: {severity}</p>
      </div>
      <div class="content">
        <p>{body}</p>
{details_block}      </div>
      <div class="footer">
{runbook}      <p>Sent by {source} at {timestamp}</p>
      </div>
    </div>
  </body>
</html>
"#,
        color = look.hex,
        emoji = look.emoji,
        source = SOURCE,
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
