use hklstore::cli::{self, Options};

#[tokio::main]
async fn main() {
    let options = Options::from_args();
    if let Err(err) = cli::run(options).await {
        eprintln!("{}", err);
        ::std::process::exit(1);
    }
}
