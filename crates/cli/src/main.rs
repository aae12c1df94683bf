fn main() {
    sift_devtools::init_tracing();
    sift_devtools::init_metrics();
    let code = sift_devtools::run(std::env::args_os(), &mut std::io::stdout(), &mut std::io::stderr());
    std::process::exit(code);
}
