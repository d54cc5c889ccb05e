use std::sync::OnceLock;
use tera::Tera;

static TERA: OnceLock<Tera> = OnceLock::new();

/// Email templates, compiled into the binary.
pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_templates([
            (
                "confirmation_email.html",
                include_str!("../templates/confirmation_email.html"),
            ),
            (
                "decision_email.html",
                include_str!("../templates/decision_email.html"),
            ),
        ])
        .expect("Failed to load email templates");
        tera
    })
}
