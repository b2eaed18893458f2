use vtally::workflow::{
    combine_decryptions, combine_public_keys, compute_tally, get_decryption_factors_and_proof,
    tally_hash, verify_encryption_proof,
};
use vtally::{
    dlog_challenge_generator, Election, ElectionRecord, EncryptedVote, KeyPair, Question, Result,
    Trustee, Voter,
};

fn main() -> Result<()> {
    println!("=== Homomorphic Tallying Demo ===\n");

    // ========== TRUSTEES ==========
    println!("--- Trustee Key Generation ---");
    let trustee_keys = vec![KeyPair::generate_for_testing()?, KeyPair::generate_for_testing()?];
    let mut trustees: Vec<Trustee> = trustee_keys
        .iter()
        .enumerate()
        .map(|(i, keypair)| {
            Trustee::new(
                format!("trustee-{}", i + 1),
                keypair.public_key.clone(),
                Some(keypair.secret_key.prove_sk(dlog_challenge_generator)),
            )
        })
        .collect();

    for trustee in &trustees {
        println!(
            "{}: {} (key proof valid: {})",
            trustee.uuid,
            trustee.public_key,
            trustee.verify_public_key()
        );
    }

    // ========== ELECTION ==========
    println!("\n--- Election Setup ---");
    let election = Election::new(
        "demo-election",
        vec![
            Question::new("Favourite option?", vec!["A".into(), "B".into()], 0, 1),
            Question::approval(
                "Which days work for you?",
                vec!["Mon".into(), "Tue".into(), "Wed".into()],
            ),
        ],
        combine_public_keys(&trustees)?,
    )?;
    println!("Election {} hash: {}", election.uuid, election.hash);

    // ========== VOTING ==========
    println!("\n--- Casting Ballots ---");
    let selections = [
        vec![vec![0], vec![0, 1]],
        vec![vec![1], vec![2]],
        vec![vec![0], vec![0, 1, 2]],
    ];

    let mut voters = Vec::new();
    for (i, selection) in selections.iter().enumerate() {
        let ballot = EncryptedVote::from_election_and_answers(&election, selection)?.into_cast();
        println!(
            "voter-{} ballot valid: {}, tracker: {}",
            i + 1,
            ballot.verify(&election),
            ballot.get_hash()?
        );

        let mut voter = Voter::new(format!("voter-{}", i + 1));
        voter.cast(ballot);
        voters.push(voter);
    }

    // ========== TALLYING ==========
    println!("\n--- Homomorphic Tally ---");
    let mut record = ElectionRecord::new(election);
    compute_tally(&mut record, &voters)?;
    if let Some(hash) = tally_hash(&record)? {
        println!("Encrypted tally hash: {}", hash);
    }

    // ========== DECRYPTION ==========
    println!("\n--- Trustee Decryption ---");
    for (trustee, keypair) in trustees.iter_mut().zip(&trustee_keys) {
        let (factors, proofs) = get_decryption_factors_and_proof(&record, &keypair.secret_key)?;
        trustee.decryption_factors = Some(factors);
        trustee.decryption_proofs = Some(proofs);
        println!(
            "{} partial decryption valid: {}",
            trustee.uuid,
            verify_encryption_proof(&record, trustee)?
        );
    }

    let results = combine_decryptions(&record, &trustees)?;
    for (question, counts) in record.election.questions.iter().zip(&results) {
        println!("\n{}", question.question);
        for (answer, count) in question.answers.iter().zip(counts) {
            println!("  {}: {}", answer, count);
        }
    }

    Ok(())
}
