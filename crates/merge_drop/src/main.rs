fn main() {
    merge_drop::run();
}
