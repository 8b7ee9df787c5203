/// Smallest even size `>= n` whose only prime factors are 2, 3 and 5
///
/// Such sizes are fast for mixed-radix FFTs, and the real-valued transforms
/// used here require an even length.
pub fn next_fft_size(n: usize) -> usize {
    let mut n = n.max(2);
    if n % 2 != 0 {
        n += 1;
    }

    loop {
        let mut m = n;
        while m % 2 == 0 {
            m /= 2;
        }
        while m % 3 == 0 {
            m /= 3;
        }
        while m % 5 == 0 {
            m /= 5;
        }

        if m == 1 {
            return n;
        }

        // Stay even
        n += 2;
    }
}
