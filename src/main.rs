use elevator_dispatch::modules;

fn main() -> std::io::Result<()> {
    modules::run()
}
