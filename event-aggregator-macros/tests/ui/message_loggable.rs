use event_aggregator::{Loggable, Message, message};

#[message]
struct Plain;

#[message(loggable)]
enum Audited {
    Login { user: String },
}

impl Loggable for Audited {
    fn render(&self) -> String {
        match self {
            Audited::Login { user } => format!("login {user}"),
        }
    }
}

fn main() {
    assert!(Plain.as_loggable().is_none());

    let ev = Audited::Login { user: "alice".into() };
    let line = ev.as_loggable().map(|l| l.render());
    assert_eq!(line.as_deref(), Some("login alice"));
}
