//! Longer user-facing texts.

pub const BANNER: &str = "Eclipse - inject environment variables on runtime";

pub const WELCOME_MESSAGE: &str = "\
It looks like this is your first time running Eclipse.

Use `eclipse projects` to see the projects you have access to, and
`eclipse link <project> [component]` to tag a repository with one.

To start injecting environment variables, run

    eclipse inject <component>/<environment> node index.js

in the tagged repository and the project's secrets will be available
in the environment of the process.

To see more available commands, run `eclipse --help`. Happy hacking!";

pub const SYNCING_MESSAGE: &str = "The CLI is syncing with Eclipse servers..";
pub const SYNC_FAILED_MESSAGE: &str =
    "We were not able to contact the Eclipse servers. Please check your connection or run `eclipse init`.";
pub const CONFIGURED_MESSAGE: &str = "Eclipse has been configured successfully.";
pub const NO_ACCESS_MESSAGE: &str =
    "It looks like you do not have access to the project tagged in this directory.";
pub const ABORTED_MESSAGE: &str = "Aborted.";
pub const CONFIRM_DELETE_PROMPT: &str = "This action cannot be undone. Please confirm deletion:";

pub fn secret_created(name: &str, project: &str) -> String {
    format!("Secret {name} created under project {project}.")
}

pub fn secret_deleted(name: &str) -> String {
    format!("Secret {name} successfully deleted.")
}

pub fn secret_not_found(name: &str, project: &str) -> String {
    format!("Secret {name} not found under project {project}")
}

pub fn env_file_written(environment: &str) -> String {
    format!(".env file for {environment} environment printed on working directory.")
}
