/// Benchmark workloads: small but loop- and call-heavy programs so each
/// pipeline phase does measurable work.
pub fn workloads() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "loop_sum",
            "fn int main() {
                int s = 0;
                for (int i = 0; i < 20000; i = i + 1) {
                    s = s + i % 7;
                }
                printInt(s);
                return 0;
            }",
        ),
        (
            "fib_recursive",
            "fn int fib(int n) {
                if (n < 2) { return n; }
                return fib(n - 1) + fib(n - 2);
            }
            fn int main() {
                printInt(fib(18));
                return 0;
            }",
        ),
        (
            "array_churn",
            "fn int main() {
                int a[64];
                int s = 0;
                for (int round = 0; round < 200; round = round + 1) {
                    for (int i = 0; i < 64; i = i + 1) {
                        a[i] = i * round;
                    }
                    for (int i = 0; i < 64; i = i + 1) {
                        s = s + a[i];
                    }
                }
                printInt(s);
                return 0;
            }",
        ),
    ]
}
