use bitmap64_rs::{Bitmap64, Optimizable, testutil::SetGen};

fn main() {
    let mut setgen = SetGen::new(0xDEAD_BEEF);

    // create a bitmap spread over 16 shards with 256 values each
    let mut bitmap: Bitmap64 = setgen.sharded(16, 256).into_iter().collect();
    bitmap.optimize();

    // retrieve a value contained by the bitmap for later
    let value = bitmap.get(9).unwrap();

    // serialize the bitmap to a byte buffer
    let bytes = bitmap.serialize();

    println!("Serialized bitmap size: {} bytes", bytes.len());
    println!("First 32 bytes of serialized bitmap:");
    // print out the first 32 bytes of the serialized bitmap in hex
    for byte in bytes.iter().take(32) {
        print!("{byte:02X} ");
    }
    println!();

    let decoded = Bitmap64::deserialize(&bytes).unwrap();

    // check that the two bitmaps are equivalent
    assert_eq!(bitmap, decoded);
    assert!(decoded.contains(value));
    assert_eq!(decoded.rank(value), 10);

    println!(
        "{} values across {} shards, min {} max {}",
        decoded.len(),
        decoded.shard_count(),
        decoded.min().unwrap(),
        decoded.max().unwrap()
    );
}
