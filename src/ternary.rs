/// A ternary expression.  The carver's border and orientation logic is
/// full of two-way picks (transposed or not, left edge or not), and
/// this keeps each of them on one line.
#[macro_export]
macro_rules! cq {
    ($condition: expr, $_true: expr, $_false: expr) => {
        if $condition {
            $_true
        } else {
            $_false
        }
    };
}
