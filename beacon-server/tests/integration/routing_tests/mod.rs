mod test_answer_races_offer;
mod test_join_call_answer;
mod test_spoofed_sender;
