fn main() {
    if let Err(err) = netdoc_topology::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
