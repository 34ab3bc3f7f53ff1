use clap::Parser;
use gwpolicy::{
    cli::{Args, PolicyLoader, StateFile},
    error::PolicyError,
    reconcile::{Reconciled, Reconciler, ResourceView},
    store::FileStore,
};

fn main() -> Result<(), PolicyError> {
    env_logger::init();

    let args = Args::parse();

    let declared = PolicyLoader::load(&args)?;
    let store = FileStore::new(&args.store);

    let reconciled =
        Reconciler::new(&store).reconcile(&declared.target, args.action.into(), &declared)?;

    let state = match &reconciled {
        Reconciled::Present(view) => {
            print_view(view);
            StateFile::from_view(view, &declared.overridden_scopes())
        }
        Reconciled::Absent => {
            println!("Gateway policy {} is absent", declared.target.path);
            StateFile::default()
        }
    };

    if let Some(state_path) = args.state.as_ref() {
        state.save(state_path)?;
    }

    Ok(())
}

fn print_view(view: &ResourceView) {
    println!("Gateway policy {} (revision {})", view.path, view.revision);
    for rule in &view.rules {
        println!(
            "  rule {:>4} {:<24} {:?} {}",
            rule.sequence_number,
            rule.display_name,
            rule.action,
            rule.assigned_id().unwrap_or("-")
        );
    }
    for rule in &view.default_rules {
        println!(
            "  default {} {:?} {}",
            rule.scope.join(","),
            rule.action,
            rule.assigned_id().unwrap_or("-")
        );
    }
}
