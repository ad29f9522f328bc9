fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cfg = srg::search::SearchConfig::default();
    let mut validate_only = false;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        let value = || args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
        match args[i].as_str() {
            "--test" | "--validate" => {
                validate_only = true;
                i += 1;
            }
            "--n" => {
                cfg.n = value().parse().unwrap_or_else(|_| usage_and_exit(2));
                i += 2;
            }
            "--k" => {
                cfg.k = value().parse().unwrap_or_else(|_| usage_and_exit(2));
                i += 2;
            }
            "--iterations" => {
                cfg.iterations = value().parse().unwrap_or_else(|_| usage_and_exit(2));
                i += 2;
            }
            "--temperature" => {
                cfg.temperature = value().parse().unwrap_or_else(|_| usage_and_exit(2));
                i += 2;
            }
            "--alpha" => {
                cfg.alpha = value().parse().unwrap_or_else(|_| usage_and_exit(2));
                i += 2;
            }
            "--seed" => {
                cfg.seed = Some(value().parse().unwrap_or_else(|_| usage_and_exit(2)));
                i += 2;
            }
            "--help" | "-h" => usage_and_exit(0),
            _ => usage_and_exit(2),
        }
    }

    if validate_only {
        match srg::validate::validate_known_graphs() {
            Ok(()) => {
                println!("Validation OK: bundled graphs are strongly regular.");
                return;
            }
            Err(e) => {
                eprintln!("Validation FAILED: {e}");
                std::process::exit(1);
            }
        }
    }

    match srg::search::run_search(&cfg) {
        Ok(outcome) => {
            log::info!(
                "best cost {} (triangles={}, squares={}), seed {}",
                outcome.best_cost, outcome.best_score.triangles, outcome.best_score.squares, outcome.seed
            );
            print!("{}", outcome.best_graph);
        }
        Err(e) => {
            log::error!("search failed: {e}");
            std::process::exit(1);
        }
    }
}

fn usage_and_exit(code: i32) -> ! {
    eprintln!(
        "Usage:\n  srg-search [--n N] [--k K] [--iterations I] [--temperature T] [--alpha A] [--seed SEED]\n  srg-search --validate\n\nOptions:\n  --n N                    Number of vertices (default: 9)\n  --k K                    Target degree (default: 4)\n  --iterations I           Iteration budget (default: 100000)\n  --temperature T          Starting temperature (default: 10.0)\n  --alpha A                Per-iteration temperature decay in (0, 1] (default: 0.9999)\n  --seed SEED              Deterministic seed (optional)\n  --test/--validate        Validate bundled graphs (fast, deterministic)\n"
    );
    std::process::exit(code)
}
