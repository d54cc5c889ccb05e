//! Outbound author notifications.
//!
//! Handlers emit events onto a channel after a successful state change; a
//! worker task renders and sends the mail. Dispatch is fire-and-forget: a
//! failed send is logged and dropped, and never affects the operation that
//! produced it. Nothing is retried.

mod mailer;

pub use mailer::ResendMailer;

use std::sync::Arc;
use tera::Context;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::lifecycle::Status;
use crate::templates;

/// Payload for one author-facing email.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub email: String,
    pub author_name: String,
    pub manuscript_title: String,
    pub submission_id: Uuid,
    pub kind: EmailKind,
}

#[derive(Debug, Clone)]
pub enum EmailKind {
    /// Sent right after a manuscript lands in the screening queue.
    Received,
    /// Sent after an editor decision that carries a template.
    Decision {
        decision: Status,
        notes: Option<String>,
    },
}

/// Cheap cloneable handle for emitting events.
#[derive(Clone)]
pub struct Notifier {
    tx: UnboundedSender<OutboundEmail>,
}

impl Notifier {
    pub fn send(&self, event: OutboundEmail) {
        if self.tx.send(event).is_err() {
            error!("Notification worker is gone; dropping email event");
        }
    }
}

/// Spawns the delivery worker and returns its sending handle.
pub fn spawn_worker(config: Arc<Config>) -> Notifier {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundEmail>();

    tokio::spawn(async move {
        let mailer = ResendMailer::new(config.resend_api_key.clone(), config.mail_from.clone());
        while let Some(event) = rx.recv().await {
            let submission_id = event.submission_id;
            match deliver(&mailer, &config, event).await {
                Ok(()) => info!("Sent notification email for submission {submission_id}"),
                Err(e) => error!("Notification for submission {submission_id} failed (ignored): {e}"),
            }
        }
    });

    Notifier { tx }
}

async fn deliver(
    mailer: &ResendMailer,
    config: &Config,
    event: OutboundEmail,
) -> Result<(), String> {
    let (subject, html) = render(config, &event)?;
    mailer.send(&event.email, &subject, &html).await
}

/// Per-decision copy block, bilingual like the portal itself.
struct DecisionCopy {
    subject: &'static str,
    heading: &'static str,
    heading_cn: &'static str,
    body: &'static str,
    body_cn: &'static str,
    color: &'static str,
}

/// Decisions without a copy block transition silently. Must stay aligned
/// with `lifecycle::decision_notifies`.
fn decision_copy(decision: Status) -> Option<DecisionCopy> {
    match decision {
        Status::UnderReview => Some(DecisionCopy {
            subject: "Your manuscript has been approved — S.H.I.T Journal",
            heading: "Approved to 发酵池!",
            heading_cn: "稿件已通过预审！",
            body: "Your manuscript has passed editorial screening and is now live in the Septic Tank (发酵池). Other researchers can browse and rate it.",
            body_cn: "您的稿件已通过编辑预审，现已进入发酵池。其他研究者可以浏览和评分。",
            color: "#16a34a",
        }),
        Status::RevisionsRequested => Some(DecisionCopy {
            subject: "Revisions requested for your manuscript — S.H.I.T Journal",
            heading: "Revisions Requested",
            heading_cn: "稿件需要修改",
            body: "Our editors have reviewed your manuscript and are requesting revisions before it can enter the Septic Tank. Please check the editor notes below and update your submission.",
            body_cn: "编辑审阅了您的稿件，需要您进行修改后才能进入发酵池。请查看下方的编辑备注并更新您的投稿。",
            color: "#2563eb",
        }),
        Status::Flushed => Some(DecisionCopy {
            subject: "Manuscript decision — S.H.I.T Journal",
            heading: "Desk Flushed",
            heading_cn: "稿件未通过预审",
            body: "After editorial review, your manuscript has not been selected for the Septic Tank at this time. Thank you for your submission.",
            body_cn: "经编辑审阅，您的稿件暂未通过预审。感谢您的投稿。",
            color: "#dc2626",
        }),
        Status::Pending | Status::Accepted | Status::Rejected => None,
    }
}

/// Renders (subject, html body) for an event.
fn render(config: &Config, event: &OutboundEmail) -> Result<(String, String), String> {
    let author_name = if event.author_name.trim().is_empty() {
        "Author"
    } else {
        event.author_name.as_str()
    };

    let mut ctx = Context::new();
    ctx.insert("author_name", author_name);
    ctx.insert("manuscript_title", &event.manuscript_title);

    match &event.kind {
        EmailKind::Received => {
            ctx.insert("dashboard_url", &format!("{}/dashboard", config.site_url));
            let html = templates::get_tera()
                .render("confirmation_email.html", &ctx)
                .map_err(|e| format!("Template error: {e}"))?;
            Ok(("Manuscript received — S.H.I.T Journal".to_string(), html))
        }
        EmailKind::Decision { decision, notes } => {
            let copy = decision_copy(*decision)
                .ok_or_else(|| format!("No email template for decision {}", decision.as_str()))?;

            // Approval links to the public preprint view; everything else
            // points the author at their dashboard.
            let (action_url, action_label) = if *decision == Status::UnderReview {
                (
                    format!("{}/preprints/{}", config.site_url, event.submission_id),
                    "View in 发酵池 / 查看预印本",
                )
            } else {
                (format!("{}/dashboard", config.site_url), "Dashboard / 仪表台")
            };

            ctx.insert("heading", copy.heading);
            ctx.insert("heading_cn", copy.heading_cn);
            ctx.insert("body", copy.body);
            ctx.insert("body_cn", copy.body_cn);
            ctx.insert("color", copy.color);
            ctx.insert("action_url", &action_url);
            ctx.insert("action_label", action_label);
            // Null when absent, so the template's if-block stays falsy.
            ctx.insert("notes", notes);

            let html = templates::get_tera()
                .render("decision_email.html", &ctx)
                .map_err(|e| format!("Template error: {e}"))?;
            Ok((copy.subject.to_string(), html))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{self, ALL_STATUSES};

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            storage_root: std::path::PathBuf::from("."),
            site_url: "https://shitjournal.org".to_string(),
            resend_api_key: None,
            mail_from: "S.H.I.T Journal <editor@shitjournal.org>".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }

    fn event(kind: EmailKind) -> OutboundEmail {
        OutboundEmail {
            email: "author@example.org".to_string(),
            author_name: "Dr. Shit".to_string(),
            manuscript_title: "On Viscosity".to_string(),
            submission_id: Uuid::nil(),
            kind,
        }
    }

    #[test]
    fn copy_table_matches_lifecycle_notification_rule() {
        for status in ALL_STATUSES {
            assert_eq!(
                decision_copy(status).is_some(),
                lifecycle::decision_notifies(status),
                "{status:?}"
            );
        }
    }

    #[test]
    fn approval_email_links_to_the_preprint() {
        let config = test_config();
        let (subject, html) = render(
            &config,
            &event(EmailKind::Decision {
                decision: Status::UnderReview,
                notes: None,
            }),
        )
        .unwrap();
        assert!(subject.contains("approved"));
        assert!(html.contains("On Viscosity"));
        assert!(html.contains(&format!("https://shitjournal.org/preprints/{}", Uuid::nil())));
        assert!(!html.contains("Editor Notes"));
    }

    #[test]
    fn revision_email_carries_editor_notes_and_dashboard_link() {
        let config = test_config();
        let (_, html) = render(
            &config,
            &event(EmailKind::Decision {
                decision: Status::RevisionsRequested,
                notes: Some("Needs more fiber".to_string()),
            }),
        )
        .unwrap();
        assert!(html.contains("Needs more fiber"));
        assert!(html.contains("https://shitjournal.org/dashboard"));
    }

    #[test]
    fn confirmation_email_renders() {
        let config = test_config();
        let (subject, html) = render(&config, &event(EmailKind::Received)).unwrap();
        assert!(subject.contains("received"));
        assert!(html.contains("Dr. Shit"));
        assert!(html.contains("https://shitjournal.org/dashboard"));
    }

    #[test]
    fn untemplated_decisions_do_not_render() {
        let config = test_config();
        let result = render(
            &config,
            &event(EmailKind::Decision {
                decision: Status::Rejected,
                notes: None,
            }),
        );
        assert!(result.is_err());
    }
}
