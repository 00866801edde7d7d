use clap::Parser;
use miette::Result;

use flatbom::cli::logging::init_logging;
use flatbom::cli::{commands, Cli, Commands};
use flatbom::core::{Config, Project};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` ends quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let project = Project::open(global.project.as_deref()).ok();
    init_logging(&Config::load_for(project.as_ref()), global.verbose);

    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Flat(args) => commands::flat::run(args, &global),
        Commands::Tree(args) => commands::tree::run(args, &global),
        Commands::WhereUsed(args) => commands::where_used::run(args, &global),
        Commands::Validate(args) => commands::validate::run(args, &global),
        Commands::Cache(cmd) => commands::cache::run(cmd, &global),
        Commands::Config(cmd) => commands::config::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
