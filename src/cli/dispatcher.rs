// src/cli/dispatcher.rs

use crate::{
    cli::{Cli, handlers},
    context::RunContext,
};
use anyhow::Result;

type Handler = fn(&Cli, &mut RunContext) -> Result<i32>;

/// A mode of operation: when it applies and which handler runs it.
struct ModeDefinition {
    name: &'static str,
    selected: fn(&Cli) -> bool,
    handler: Handler,
}

/// Modes in priority order. The first selected one runs; without any, the words
/// name a script.
static MODE_REGISTRY: &[ModeDefinition] = &[
    ModeDefinition {
        name: "list-projects",
        selected: |cli| cli.list_projects,
        handler: handlers::projects::handle_list,
    },
    ModeDefinition {
        name: "add-project",
        selected: |cli| cli.add_project,
        handler: handlers::projects::handle_add,
    },
    ModeDefinition {
        name: "remove-project",
        selected: |cli| cli.remove_project,
        handler: handlers::projects::handle_remove,
    },
    ModeDefinition {
        name: "project-path",
        selected: |cli| cli.project_path.is_some(),
        handler: handlers::projects::handle_path,
    },
    ModeDefinition {
        name: "list-chains",
        selected: |cli| cli.list_chains,
        handler: handlers::chains::handle_list,
    },
    ModeDefinition {
        name: "show-chain",
        selected: |cli| cli.show_chain.is_some(),
        handler: handlers::chains::handle_show,
    },
    ModeDefinition {
        name: "add-chain",
        selected: |cli| cli.add_chain.is_some(),
        handler: handlers::chains::handle_add,
    },
    ModeDefinition {
        name: "remove-chain",
        selected: |cli| cli.remove_chain.is_some(),
        handler: handlers::chains::handle_remove,
    },
    ModeDefinition {
        name: "personal-flag",
        selected: |cli| cli.personal_flag.is_some(),
        handler: handlers::personal::handle,
    },
    ModeDefinition {
        name: "alias",
        selected: |cli| cli.alias,
        handler: handlers::alias::handle,
    },
    ModeDefinition {
        name: "chains",
        selected: |cli| cli.chains,
        handler: handlers::chains::handle_run_many,
    },
    ModeDefinition {
        name: "chain-projects",
        selected: |cli| cli.chain_projects,
        handler: handlers::chains::handle_run_in_projects,
    },
    ModeDefinition {
        name: "chain",
        selected: |cli| cli.chain,
        handler: handlers::chains::handle_run,
    },
    ModeDefinition {
        name: "exec-projects",
        selected: |cli| cli.exec_projects,
        handler: handlers::exec::handle_in_projects,
    },
    ModeDefinition {
        name: "exec",
        selected: |cli| cli.exec,
        handler: handlers::exec::handle,
    },
    ModeDefinition {
        name: "info",
        selected: |cli| cli.info,
        handler: handlers::info::handle,
    },
    ModeDefinition {
        name: "show",
        selected: |cli| cli.show,
        handler: handlers::list::handle_show,
    },
    ModeDefinition {
        name: "list",
        selected: |cli| cli.list,
        handler: handlers::list::handle_list,
    },
    ModeDefinition {
        name: "npm",
        selected: |cli| cli.npm,
        handler: handlers::run::handle_npm,
    },
];

/// Picks the mode for `cli` and runs it. Returns the process exit code.
pub fn dispatch(cli: &Cli, ctx: &mut RunContext) -> Result<i32> {
    log::debug!("Dispatching: {:?}", cli);
    match MODE_REGISTRY.iter().find(|mode| (mode.selected)(cli)) {
        Some(mode) => {
            log::debug!("Mode '{}' selected", mode.name);
            (mode.handler)(cli, ctx)
        }
        None => handlers::run::handle(cli, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn selected_mode(args: &[&str]) -> Option<&'static str> {
        let cli = Cli::try_parse_from(std::iter::once("nrun").chain(args.iter().copied())).unwrap();
        MODE_REGISTRY
            .iter()
            .find(|mode| (mode.selected)(&cli))
            .map(|mode| mode.name)
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(selected_mode(&["start"]), None);
        assert_eq!(selected_mode(&["-x", "deploy"]), Some("chain"));
        assert_eq!(selected_mode(&["--xm", "a", "b"]), Some("chains"));
        assert_eq!(selected_mode(&["--xa", "deploy", "make", "all"]), Some("add-chain"));
        assert_eq!(selected_mode(&["--pl"]), Some("list-projects"));
        assert_eq!(selected_mode(&["--path", "web"]), Some("project-path"));
        assert_eq!(selected_mode(&["--pf", "morning"]), Some("personal-flag"));
        assert_eq!(selected_mode(&["-l", "-x"]), Some("chain"));
    }

    #[test]
    fn test_script_arguments_are_not_parsed_as_flags() {
        let cli = Cli::try_parse_from(["nrun", "test", "--watch", "-l"]).unwrap();
        assert_eq!(cli.words, vec!["test", "--watch", "-l"]);
        assert!(!cli.list);
    }
}
