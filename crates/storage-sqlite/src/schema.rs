diesel::table! {
    token_holder (id) {
        id -> BigInt,
        signer -> Nullable<Text>,
        evm_address -> Nullable<Text>,
        holder_type -> Text,
        token_address -> Text,
        nft_id -> Nullable<Text>,
        balance -> Text,
        info -> Text,
        timestamp -> Text,
    }
}
