use clap::{Arg, Command};

use crate::auth::Role;

pub const CMD_ISSUE_TOKEN: &str = "issue-token";
pub const ARG_SUBJECT: &str = "subject";
pub const ARG_ROLE: &str = "role";
pub const ARG_USER_TYPE: &str = "user-type";
pub const ARG_NIC: &str = "nic";

/// Operator subcommand that mints an access token, typically for back-office use.
#[must_use]
pub fn subcommand() -> Command {
    Command::new(CMD_ISSUE_TOKEN)
        .about("Mint an access token with the configured signing secret")
        .arg(
            Arg::new(ARG_SUBJECT)
                .long(ARG_SUBJECT)
                .help("Subject (account id) of the token")
                .required(true)
                .value_parser(clap::value_parser!(uuid::Uuid)),
        )
        .arg(
            Arg::new(ARG_ROLE)
                .long(ARG_ROLE)
                .help("Role claim")
                .default_value(Role::BACK_OFFICE),
        )
        .arg(
            Arg::new(ARG_USER_TYPE)
                .long(ARG_USER_TYPE)
                .help("User type claim")
                .default_value(Role::BACK_OFFICE),
        )
        .arg(
            Arg::new(ARG_NIC)
                .long(ARG_NIC)
                .help("Optional NIC claim"),
        )
}
