//! tally auth command implementations.

use super::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::users::{Registration, Role, UserStore};

fn store(ctx: &Context) -> UserStore {
    UserStore::new(ctx.storage.clone(), ctx.config.auth.clone())
}

pub fn run_register(
    ctx: &Context,
    eid: String,
    name: String,
    password: String,
    role: &str,
) -> Result<()> {
    let role: Role = role.parse()?;
    let user = store(ctx).register(Registration {
        eid,
        name,
        password,
        role,
    })?;
    let mut human = HumanOutput::new("User registered");
    human.push_summary("EID", user.eid.clone());
    human.push_summary("Role", user.role.to_string());
    human.push_next_step(format!("tally auth login --eid {}", user.eid));
    emit_success(ctx.output, "auth register", &user, Some(&human))
}

pub fn run_login(ctx: &Context, eid: &str, password: &str) -> Result<()> {
    let login = store(ctx).login(eid, password)?;
    let mut human = HumanOutput::new(format!("Logged in as {}", login.user.eid));
    human.push_summary("Token", login.token.clone());
    human.push_summary("Expires", login.expires_at.to_rfc3339());
    emit_success(ctx.output, "auth login", &login, Some(&human))
}

pub fn run_me(ctx: &Context, token: &str) -> Result<()> {
    let user = store(ctx).me(token)?;
    let mut human = HumanOutput::new(format!("{} ({})", user.name, user.eid));
    human.push_summary("Role", user.role.to_string());
    human.push_summary("Since", user.created_at.to_rfc3339());
    emit_success(ctx.output, "auth me", &user, Some(&human))
}
