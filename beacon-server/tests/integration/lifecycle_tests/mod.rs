mod test_close_then_rejoin;
